//! Analyzer configuration
//!
//! Every tunable of the forecasting, trend and recommendation rules lives in
//! [`AnalyzerConfig`]. Config is loaded with a two-layer resolution:
//! 1. Explicit path, or the override in the data dir
//!    (~/.local/share/voltcast/config/voltcast.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from a file keep their default values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Metric;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/voltcast.toml");

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub training: TrainingConfig,
    pub forecast: ForecastConfig,
    pub trend: TrendConfig,
    pub insights: InsightThresholds,
    pub recommendations: RecommendationThresholds,
}

/// Feature derivation and model fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Training requires strictly more readings than this
    pub min_samples: usize,
    /// Lag offsets (in readings) for lagged consumption features
    pub lags: Vec<usize>,
    /// Trailing window size for the rolling-mean feature
    pub rolling_window: usize,
    /// Ridge penalty applied to standardized coefficients
    pub ridge_penalty: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_samples: 24,
            lags: vec![1, 2, 3],
            rolling_window: 6,
            ridge_penalty: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Forecast value when there is no observation to fall back on
    pub baseline_default: f64,
    pub default_horizon: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            baseline_default: 0.0,
            default_horizon: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Minimum readings for a meaningful trend
    pub min_samples: usize,
    /// Default symmetric slope threshold (units per hour)
    pub slope_epsilon: f64,
    /// Per-metric overrides keyed by metric name
    pub metric_epsilon: BTreeMap<String, f64>,
}

impl Default for TrendConfig {
    fn default() -> Self {
        let mut metric_epsilon = BTreeMap::new();
        metric_epsilon.insert(Metric::Efficiency.as_str().to_string(), 0.002);

        Self {
            min_samples: 2,
            slope_epsilon: 0.05,
            metric_epsilon,
        }
    }
}

impl TrendConfig {
    /// Slope threshold for a metric (override or default)
    pub fn epsilon_for(&self, metric: Metric) -> f64 {
        self.metric_epsilon
            .get(metric.as_str())
            .copied()
            .unwrap_or(self.slope_epsilon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// Relative change at which a trend stops being "slight"
    pub moderate_change: f64,
    /// Relative change at which a trend is "strong"
    pub strong_change: f64,
    /// Residual deviation / mean above which a metric is volatile
    pub volatility_ratio: f64,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            moderate_change: 0.10,
            strong_change: 0.25,
            volatility_ratio: 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    /// Load/capacity ratio that triggers the high-load warning
    pub load_warning_ratio: f64,
    /// Load/capacity ratio that triggers the critical-load alert
    pub critical_load_ratio: f64,
    /// Efficiency below this triggers the low-efficiency warning
    pub efficiency_floor: f64,
    /// Efficiency at or above this is reported as excellent
    pub efficiency_excellent: f64,
    /// Tolerated produced/consumed imbalance (fraction)
    pub balance_margin: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            load_warning_ratio: 0.85,
            critical_load_ratio: 0.95,
            efficiency_floor: 0.70,
            efficiency_excellent: 0.90,
            balance_margin: 0.10,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration (explicit path or override first, then default)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => fs::read_to_string(&default_path)
                    .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalyzerConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Check internal consistency of all thresholds
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if t.min_samples == 0 {
            return Err(Error::Config("training.min_samples must be at least 1".into()));
        }
        if t.lags.is_empty() || t.lags.contains(&0) {
            return Err(Error::Config(
                "training.lags must be a non-empty list of positive offsets".into(),
            ));
        }
        if t.rolling_window == 0 {
            return Err(Error::Config("training.rolling_window must be at least 1".into()));
        }
        if !t.ridge_penalty.is_finite() || t.ridge_penalty < 0.0 {
            return Err(Error::Config("training.ridge_penalty must be >= 0".into()));
        }

        let f = &self.forecast;
        if !f.baseline_default.is_finite() || f.baseline_default < 0.0 {
            return Err(Error::Config("forecast.baseline_default must be >= 0".into()));
        }

        let tr = &self.trend;
        if tr.min_samples < 2 {
            return Err(Error::Config("trend.min_samples must be at least 2".into()));
        }
        if !tr.slope_epsilon.is_finite() || tr.slope_epsilon <= 0.0 {
            return Err(Error::Config("trend.slope_epsilon must be > 0".into()));
        }
        for (name, epsilon) in &tr.metric_epsilon {
            name.parse::<Metric>()
                .map_err(|e| Error::Config(format!("trend.metric_epsilon: {}", e)))?;
            if !epsilon.is_finite() || *epsilon <= 0.0 {
                return Err(Error::Config(format!(
                    "trend.metric_epsilon.{} must be > 0",
                    name
                )));
            }
        }

        let i = &self.insights;
        if !(i.moderate_change > 0.0 && i.moderate_change < i.strong_change) {
            return Err(Error::Config(
                "insights.moderate_change must be positive and below strong_change".into(),
            ));
        }
        if !i.volatility_ratio.is_finite() || i.volatility_ratio <= 0.0 {
            return Err(Error::Config("insights.volatility_ratio must be > 0".into()));
        }

        let r = &self.recommendations;
        if !(r.load_warning_ratio > 0.0 && r.load_warning_ratio < r.critical_load_ratio) {
            return Err(Error::Config(
                "recommendations.load_warning_ratio must be positive and below critical_load_ratio"
                    .into(),
            ));
        }
        if !(0.0..=1.0).contains(&r.efficiency_floor)
            || !(0.0..=1.0).contains(&r.efficiency_excellent)
            || r.efficiency_floor > r.efficiency_excellent
        {
            return Err(Error::Config(
                "recommendations efficiency thresholds must satisfy 0 <= floor <= excellent <= 1"
                    .into(),
            ));
        }
        if !r.balance_margin.is_finite() || r.balance_margin < 0.0 {
            return Err(Error::Config("recommendations.balance_margin must be >= 0".into()));
        }

        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("voltcast").join("config").join("voltcast.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = AnalyzerConfig::from_toml_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = AnalyzerConfig::from_toml_str(
            r#"
            [recommendations]
            load_warning_ratio = 0.8

            [trend.metric_epsilon]
            current_load = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.recommendations.load_warning_ratio, 0.8);
        assert_eq!(config.recommendations.critical_load_ratio, 0.95);
        assert_eq!(config.training.min_samples, 24);
        assert_eq!(config.trend.epsilon_for(Metric::CurrentLoad), 0.5);
        assert_eq!(config.trend.epsilon_for(Metric::EnergyConsumed), 0.05);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let inverted = AnalyzerConfig::from_toml_str(
            r#"
            [recommendations]
            load_warning_ratio = 0.99
            critical_load_ratio = 0.9
            "#,
        );
        assert!(matches!(inverted, Err(Error::Config(_))));

        let unknown_metric = AnalyzerConfig::from_toml_str(
            r#"
            [trend.metric_epsilon]
            voltage = 0.1
            "#,
        );
        assert!(unknown_metric.is_err());

        let zero_lag = AnalyzerConfig::from_toml_str("[training]\nlags = [0, 1]\n");
        assert!(zero_lag.is_err());
    }

    #[test]
    fn test_load_from_path_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voltcast.toml");
        fs::write(&path, "[forecast]\nbaseline_default = 12.5\n").unwrap();

        let config = AnalyzerConfig::load(Some(&path)).unwrap();
        assert_eq!(config.forecast.baseline_default, 12.5);

        let rendered = config.to_toml_string().unwrap();
        assert_eq!(AnalyzerConfig::from_toml_str(&rendered).unwrap(), config);
    }

    #[test]
    fn test_load_missing_path_errors() {
        let result = AnalyzerConfig::load(Some(Path::new("/nonexistent/voltcast.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
