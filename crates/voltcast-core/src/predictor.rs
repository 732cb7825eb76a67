//! Consumption forecaster
//!
//! Fits a linear model of `energy_consumed` on calendar and lag features and
//! rolls it forward hour by hour. The fitted model is the only mutable state
//! in the core. It sits behind a `RwLock`: fitting happens outside the lock,
//! the finished model is swapped in under the write lock, and a forecast holds
//! the read lock for its whole duration, so no caller sees a half-replaced
//! model.
//!
//! ## Baseline policy
//!
//! Forecasting never fails. When the model path is unavailable it degrades
//! deterministically:
//! - no readings at all → `forecast.baseline_default` for every hour
//! - no fitted model, too little history, or a non-finite prediction → the
//!   last observed consumption for every hour
//!
//! Training on too few readings, or a failed fit, clears the held model.

use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AnalyzerConfig;
use crate::features::FeatureBuilder;
use crate::models::{sanitize, Reading};
use crate::regression::LinearModel;

/// Where forecast values came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastSource {
    /// Fitted regression model
    Model,
    /// Last observed consumption repeated
    LastObserved,
    /// Configured default (no readings)
    Default,
}

impl ForecastSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastSource::Model => "model",
            ForecastSource::LastObserved => "last_observed",
            ForecastSource::Default => "default",
        }
    }
}

impl std::fmt::Display for ForecastSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// 1 for the first forecast hour
    pub hours_ahead: usize,
    /// Absent when there was no reading to anchor the forecast
    pub timestamp: Option<DateTime<Utc>>,
    pub value: f64,
}

/// A consumption forecast with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub last_observed: Option<DateTime<Utc>>,
    pub points: Vec<ForecastPoint>,
    pub source: ForecastSource,
    /// Fit score of the model used, 0.0 for baseline forecasts
    pub fit_score: f64,
}

impl Forecast {
    fn from_values(
        last_observed: Option<DateTime<Utc>>,
        values: Vec<f64>,
        source: ForecastSource,
        fit_score: f64,
    ) -> Self {
        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| ForecastPoint {
                hours_ahead: i + 1,
                timestamp: last_observed.map(|ts| ts + Duration::hours(i as i64 + 1)),
                value,
            })
            .collect();

        Self {
            last_observed,
            points,
            source,
            fit_score,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Description of the currently held model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub fit_score: f64,
    pub training_samples: usize,
    pub feature_count: usize,
    /// Timestamp of the newest reading the model was trained on
    pub trained_through: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct FittedModel {
    model: LinearModel,
    fit_score: f64,
    trained_through: DateTime<Utc>,
}

/// Re-trainable consumption forecaster
#[derive(Debug)]
pub struct ConsumptionPredictor {
    builder: FeatureBuilder,
    min_samples: usize,
    ridge_penalty: f64,
    baseline_default: f64,
    model: RwLock<Option<FittedModel>>,
}

impl Default for ConsumptionPredictor {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl ConsumptionPredictor {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            builder: FeatureBuilder::new(&config.training),
            min_samples: config.training.min_samples,
            ridge_penalty: config.training.ridge_penalty,
            baseline_default: config.forecast.baseline_default,
            model: RwLock::new(None),
        }
    }

    /// Refit on `readings` and return the fit score in [0, 1].
    ///
    /// Returns 0.0 and clears the held model when there are not more than
    /// `min_samples` readings or the fit fails.
    pub fn train(&self, readings: &[Reading]) -> f64 {
        let readings = sanitize(readings);

        if readings.len() <= self.min_samples {
            info!(
                samples = readings.len(),
                required = self.min_samples + 1,
                "Not enough readings to train, clearing model"
            );
            self.replace(None);
            return 0.0;
        }

        let vectors = self.builder.build(&readings);
        let rows: Vec<Vec<f64>> = vectors.iter().map(|v| v.design_row()).collect();
        let targets: Vec<f64> = vectors.iter().filter_map(|v| v.target).collect();

        match LinearModel::fit(&rows, &targets, self.ridge_penalty) {
            Ok(model) => {
                let fit_score = model.r_squared();
                let trained_through = readings[readings.len() - 1].timestamp;

                info!(
                    samples = model.n_observations(),
                    features = model.n_features(),
                    fit_score,
                    "Trained consumption model"
                );

                self.replace(Some(FittedModel {
                    model,
                    fit_score,
                    trained_through,
                }));
                fit_score
            }
            Err(e) => {
                warn!(
                    samples = rows.len(),
                    error = %e,
                    "Consumption model fit failed, falling back to baseline"
                );
                self.replace(None);
                0.0
            }
        }
    }

    /// Forecast `horizon` hourly consumption values after the last reading
    pub fn predict(&self, readings: &[Reading], horizon: usize) -> Vec<f64> {
        self.forecast(readings, horizon).values()
    }

    /// Forecast with timestamps and the source of the values
    pub fn forecast(&self, readings: &[Reading], horizon: usize) -> Forecast {
        let readings = sanitize(readings);

        let Some(last) = readings.last() else {
            return Forecast::from_values(
                None,
                vec![self.baseline_default; horizon],
                ForecastSource::Default,
                0.0,
            );
        };

        let baseline = || {
            Forecast::from_values(
                Some(last.timestamp),
                vec![last.energy_consumed; horizon],
                ForecastSource::LastObserved,
                0.0,
            )
        };

        let guard = self.read();
        let Some(fitted) = guard.as_ref() else {
            debug!("No fitted model, forecasting last observed consumption");
            return baseline();
        };

        let mut history: Vec<f64> = readings.iter().map(|r| r.energy_consumed).collect();
        let mut values = Vec::with_capacity(horizon);

        for step in 1..=horizon {
            let timestamp = last.timestamp + Duration::hours(step as i64);

            let Some(vector) = self.builder.vector_for(timestamp, &history) else {
                debug!(
                    history = history.len(),
                    warm_up = self.builder.warm_up(),
                    "History shorter than feature warm-up, forecasting last observed consumption"
                );
                return baseline();
            };

            let value = fitted.model.predict(&vector.design_row());
            if !value.is_finite() {
                warn!(step, "Non-finite model output, forecasting last observed consumption");
                return baseline();
            }

            let value = value.max(0.0);
            values.push(value);
            history.push(value);
        }

        Forecast::from_values(
            Some(last.timestamp),
            values,
            ForecastSource::Model,
            fitted.fit_score,
        )
    }

    /// Fit score of the held model, 0.0 when untrained
    pub fn fit_score(&self) -> f64 {
        self.read().as_ref().map(|m| m.fit_score).unwrap_or(0.0)
    }

    pub fn is_trained(&self) -> bool {
        self.read().is_some()
    }

    pub fn model_summary(&self) -> Option<ModelSummary> {
        self.read().as_ref().map(|m| ModelSummary {
            fit_score: m.fit_score,
            training_samples: m.model.n_observations(),
            feature_count: m.model.n_features(),
            trained_through: m.trained_through,
        })
    }

    /// Drop the held model
    pub fn clear(&self) {
        self.replace(None);
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<FittedModel>> {
        // The guarded value is only ever replaced wholesale, so a poisoned
        // lock still holds a consistent model.
        self.model.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, fitted: Option<FittedModel>) {
        let mut guard = self.model.write().unwrap_or_else(PoisonError::into_inner);
        *guard = fitted;
    }
}
