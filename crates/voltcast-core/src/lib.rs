//! Voltcast Core Library
//!
//! Forecasting and trend analysis for facility energy readings:
//! - Feature derivation from timestamped readings (calendar, lag, rolling)
//! - Re-trainable regression forecaster for energy consumption
//! - Per-metric trend classification (direction, slope, volatility)
//! - Rule-table insights and operational recommendations
//! - Reading store abstraction with an in-memory/CSV implementation
//!
//! Nothing in the forecasting, trend or insight paths performs I/O; they
//! consume and return in-memory sequences.

pub mod config;
pub mod error;
pub mod features;
pub mod insights;
pub mod models;
pub mod predictor;
pub mod regression;
pub mod service;
pub mod store;
pub mod trend;

pub use config::AnalyzerConfig;
pub use error::{Error, Result};
pub use features::{FeatureBuilder, FeatureVector};
pub use insights::{Insight, InsightGenerator, MagnitudeBucket, Recommendation, Severity};
pub use models::{Metric, NewReading, Reading, Snapshot};
pub use predictor::{ConsumptionPredictor, Forecast, ForecastPoint, ForecastSource, ModelSummary};
pub use service::EnergyIntelligence;
pub use store::{InMemoryStore, SampleStore};
pub use trend::{TrendAnalyzer, TrendDirection, TrendReport};
