//! Feature derivation for the consumption forecaster
//!
//! Each feature vector describes one reading by its calendar position
//! (hour of day, day of week) and the consumption history that precedes it
//! (lagged values and a trailing rolling mean). The first `warm_up()`
//! readings only serve as history and produce no vector.

use std::f64::consts::TAU;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::models::{sanitize, Reading};

/// Derived features for one reading (or one future hour)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub timestamp: DateTime<Utc>,
    /// 0..=23
    pub hour_of_day: u32,
    /// 0..=6, Monday = 0
    pub day_of_week: u32,
    /// Consumption `k` readings back, in the configured lag order
    pub lags: Vec<f64>,
    /// Mean consumption over the trailing window
    pub rolling_mean: f64,
    /// Observed consumption; None for future hours
    pub target: Option<f64>,
}

impl FeatureVector {
    /// Numeric regression input (intercept excluded).
    ///
    /// Calendar positions are encoded on the unit circle so that 23:00 sits
    /// next to 00:00 and Sunday next to Monday.
    pub fn design_row(&self) -> Vec<f64> {
        let hour_angle = TAU * self.hour_of_day as f64 / 24.0;
        let day_angle = TAU * self.day_of_week as f64 / 7.0;

        let mut row = Vec::with_capacity(5 + self.lags.len());
        row.push(hour_angle.sin());
        row.push(hour_angle.cos());
        row.push(day_angle.sin());
        row.push(day_angle.cos());
        row.extend_from_slice(&self.lags);
        row.push(self.rolling_mean);
        row
    }
}

/// Stateless builder of feature vectors
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBuilder {
    lags: Vec<usize>,
    rolling_window: usize,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(&TrainingConfig::default())
    }
}

impl FeatureBuilder {
    /// Zero lags are dropped and the rolling window is at least one reading
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            lags: config.lags.iter().copied().filter(|&k| k > 0).collect(),
            rolling_window: config.rolling_window.max(1),
        }
    }

    /// Leading readings needed before the first vector can be built
    pub fn warm_up(&self) -> usize {
        self.lags
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
            .max(self.rolling_window)
    }

    /// Width of `FeatureVector::design_row`
    pub fn feature_count(&self) -> usize {
        5 + self.lags.len()
    }

    /// Build one vector per (sanitized) reading after the warm-up.
    ///
    /// Returns an empty vector when there are not enough readings; callers
    /// treat that as insufficient data.
    pub fn build(&self, readings: &[Reading]) -> Vec<FeatureVector> {
        let readings = sanitize(readings);
        let warm_up = self.warm_up();
        if readings.len() <= warm_up {
            return Vec::new();
        }

        let consumption: Vec<f64> = readings.iter().map(|r| r.energy_consumed).collect();

        readings
            .iter()
            .enumerate()
            .skip(warm_up)
            .filter_map(|(i, reading)| {
                self.vector_for(reading.timestamp, &consumption[..i])
                    .map(|mut vector| {
                        vector.target = Some(reading.energy_consumed);
                        vector
                    })
            })
            .collect()
    }

    /// Build the vector for `timestamp` from the consumption values that
    /// immediately precede it (oldest first).
    pub fn vector_for(&self, timestamp: DateTime<Utc>, history: &[f64]) -> Option<FeatureVector> {
        if history.len() < self.warm_up() {
            return None;
        }

        let lags = self
            .lags
            .iter()
            .map(|&k| history[history.len() - k])
            .collect();

        let window = &history[history.len() - self.rolling_window..];
        let rolling_mean = window.iter().sum::<f64>() / window.len() as f64;

        Some(FeatureVector {
            timestamp,
            hour_of_day: timestamp.hour(),
            day_of_week: timestamp.weekday().num_days_from_monday(),
            lags,
            rolling_mean,
            target: None,
        })
    }
}
