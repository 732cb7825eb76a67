//! Trend classification per metric
//!
//! For each metric the slope is the ordinary-least-squares fit of value
//! against hours elapsed since the first reading in the window. Volatility is
//! the standard deviation of the residuals around that line, so a steady ramp
//! has zero volatility.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AnalyzerConfig, TrendConfig};
use crate::models::{sanitize, Metric, Reading};

/// Qualitative slope classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
    InsufficientData,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Falling => "falling",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficient_data",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrendDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rising" => Ok(TrendDirection::Rising),
            "falling" => Ok(TrendDirection::Falling),
            "stable" => Ok(TrendDirection::Stable),
            "insufficient_data" => Ok(TrendDirection::InsufficientData),
            _ => Err(format!("Unknown trend direction: {}", s)),
        }
    }
}

/// Trend of one metric over a window of readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub metric: Metric,
    pub direction: TrendDirection,
    /// Units per hour
    pub slope: f64,
    /// Standard deviation of residuals from the fitted line
    pub volatility: f64,
    pub window_size: usize,
    pub mean: f64,
    /// Hours between first and last reading
    pub span_hours: f64,
    /// Fitted change over the window relative to the mean
    pub relative_change: f64,
}

impl TrendReport {
    fn insufficient(metric: Metric, window_size: usize) -> Self {
        Self {
            metric,
            direction: TrendDirection::InsufficientData,
            slope: 0.0,
            volatility: 0.0,
            window_size,
            mean: 0.0,
            span_hours: 0.0,
            relative_change: 0.0,
        }
    }

    /// Residual deviation relative to the mean magnitude (0 for a zero mean)
    pub fn volatility_ratio(&self) -> f64 {
        if self.mean.abs() > f64::EPSILON {
            self.volatility / self.mean.abs()
        } else {
            0.0
        }
    }
}

/// Stateless per-metric trend analyzer
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    config: TrendConfig,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl TrendAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            config: config.trend.clone(),
        }
    }

    /// Classify every metric over the whole window
    pub fn analyze(&self, readings: &[Reading]) -> BTreeMap<Metric, TrendReport> {
        let readings = sanitize(readings);
        let n = readings.len();

        let span_hours = match (readings.first(), readings.last()) {
            (Some(first), Some(last)) => hours_between(first.timestamp, last.timestamp),
            _ => 0.0,
        };

        if n < self.config.min_samples || span_hours <= 0.0 {
            debug!(
                samples = n,
                required = self.config.min_samples,
                "Not enough readings for trend analysis"
            );
            return Metric::ALL
                .iter()
                .map(|&m| (m, TrendReport::insufficient(m, n)))
                .collect();
        }

        let origin = readings[0].timestamp;
        let hours: Vec<f64> = readings
            .iter()
            .map(|r| hours_between(origin, r.timestamp))
            .collect();

        Metric::ALL
            .iter()
            .map(|&metric| {
                let values: Vec<f64> = readings.iter().map(|r| metric.value_of(r)).collect();
                (metric, self.report(metric, &hours, &values, span_hours))
            })
            .collect()
    }

    /// Classify only readings within `hours` of the newest reading.
    ///
    /// A negative `hours` selects nothing. A window reaching past the
    /// representable time range covers every reading.
    pub fn analyze_window(&self, readings: &[Reading], hours: i64) -> BTreeMap<Metric, TrendReport> {
        let Some(newest) = readings.iter().map(|r| r.timestamp).max() else {
            return self.analyze(&[]);
        };
        if hours < 0 {
            debug!(hours, "Negative trend window, no readings selected");
            return self.analyze(&[]);
        }

        let cutoff = Duration::try_hours(hours).and_then(|span| newest.checked_sub_signed(span));
        let Some(cutoff) = cutoff else {
            debug!(hours, "Trend window exceeds time range, using all readings");
            return self.analyze(readings);
        };

        let window: Vec<Reading> = readings
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect();
        self.analyze(&window)
    }

    fn report(&self, metric: Metric, hours: &[f64], values: &[f64], span_hours: f64) -> TrendReport {
        let n = values.len();
        let nf = n as f64;
        let t_mean = hours.iter().sum::<f64>() / nf;
        let y_mean = values.iter().sum::<f64>() / nf;

        let sxx: f64 = hours.iter().map(|t| (t - t_mean).powi(2)).sum();
        let sxy: f64 = hours
            .iter()
            .zip(values)
            .map(|(t, y)| (t - t_mean) * (y - y_mean))
            .sum();

        if sxx <= f64::EPSILON {
            return TrendReport::insufficient(metric, n);
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * t_mean;

        let residual_ss: f64 = hours
            .iter()
            .zip(values)
            .map(|(t, y)| (y - (intercept + slope * t)).powi(2))
            .sum();
        let volatility = (residual_ss / nf).sqrt();

        let relative_change = if y_mean.abs() > f64::EPSILON {
            slope * span_hours / y_mean.abs()
        } else {
            0.0
        };

        let epsilon = self.config.epsilon_for(metric);
        let direction = if slope.abs() < epsilon {
            TrendDirection::Stable
        } else if slope > 0.0 {
            TrendDirection::Rising
        } else {
            TrendDirection::Falling
        };

        TrendReport {
            metric,
            direction,
            slope,
            volatility,
            window_size: n,
            mean: y_mean,
            span_hours,
            relative_change,
        }
    }
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}
