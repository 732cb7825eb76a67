//! Energy intelligence facade
//!
//! Bundles one predictor, one trend analyzer and one insight generator built
//! from a single [`AnalyzerConfig`]. Construct it once and pass it (or an
//! `Arc` of it) to whoever needs it; there is no global instance.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::insights::{Insight, InsightGenerator, Recommendation};
use crate::models::{Metric, Reading, Snapshot};
use crate::predictor::{ConsumptionPredictor, Forecast};
use crate::store::SampleStore;
use crate::trend::{TrendAnalyzer, TrendReport};

#[derive(Debug)]
pub struct EnergyIntelligence {
    config: AnalyzerConfig,
    predictor: Arc<ConsumptionPredictor>,
    analyzer: TrendAnalyzer,
    generator: InsightGenerator,
}

impl Default for EnergyIntelligence {
    fn default() -> Self {
        Self::new(&AnalyzerConfig::default())
    }
}

impl EnergyIntelligence {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::with_generator(config, InsightGenerator::new(config))
    }

    /// Use a generator with custom rule tables
    pub fn with_generator(config: &AnalyzerConfig, generator: InsightGenerator) -> Self {
        Self {
            config: config.clone(),
            predictor: Arc::new(ConsumptionPredictor::new(config)),
            analyzer: TrendAnalyzer::new(config),
            generator,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Shared handle to the predictor, for background re-training
    pub fn predictor(&self) -> Arc<ConsumptionPredictor> {
        Arc::clone(&self.predictor)
    }

    /// Refit the consumption model; returns the fit score in [0, 1]
    pub fn train(&self, readings: &[Reading]) -> f64 {
        self.predictor.train(readings)
    }

    /// Hourly consumption forecast of length `horizon`
    pub fn predict(&self, readings: &[Reading], horizon: usize) -> Vec<f64> {
        self.predictor.predict(readings, horizon)
    }

    pub fn forecast(&self, readings: &[Reading], horizon: usize) -> Forecast {
        self.predictor.forecast(readings, horizon)
    }

    pub fn analyze_trends(&self, readings: &[Reading]) -> BTreeMap<Metric, TrendReport> {
        self.analyzer.analyze(readings)
    }

    /// Trends over the `hours` before the newest reading
    pub fn analyze_trends_window(
        &self,
        readings: &[Reading],
        hours: i64,
    ) -> BTreeMap<Metric, TrendReport> {
        self.analyzer.analyze_window(readings, hours)
    }

    pub fn get_trend_insights(&self, reports: &BTreeMap<Metric, TrendReport>) -> Vec<Insight> {
        self.generator.insights(reports)
    }

    pub fn get_ai_recommendations(&self, snapshot: &Snapshot) -> Vec<Recommendation> {
        self.generator.recommendations(snapshot)
    }

    /// Fetch a facility's readings since `since` and train on them
    pub fn train_from_store(
        &self,
        store: &dyn SampleStore,
        facility_id: i64,
        since: DateTime<Utc>,
    ) -> Result<f64> {
        let readings = store.fetch_readings(facility_id, since)?;
        debug!(facility_id, readings = readings.len(), "Training from store");
        Ok(self.train(&readings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::ForecastSource;
    use crate::store::InMemoryStore;
    use chrono::{Duration, TimeZone};

    fn daily_pattern(hours: i64) -> Vec<Reading> {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        (0..hours)
            .map(|i| {
                let hour = (i % 24) as f64;
                let consumed = 40.0 + 10.0 * (hour / 24.0 * std::f64::consts::TAU).sin();
                Reading::new(start + Duration::hours(i), 30.0, consumed, 0.8, 50.0, 1)
            })
            .collect()
    }

    #[test]
    fn test_facade_delegates() {
        let service = EnergyIntelligence::default();
        let readings = daily_pattern(72);

        let score = service.train(&readings);
        assert!((0.0..=1.0).contains(&score));
        assert!(service.predictor().is_trained());

        let forecast = service.forecast(&readings, 6);
        assert_eq!(forecast.source, ForecastSource::Model);
        assert_eq!(service.predict(&readings, 6), forecast.values());

        let trends = service.analyze_trends(&readings);
        assert_eq!(trends.len(), 4);
        assert!(!service.get_trend_insights(&trends).is_empty());
    }

    #[test]
    fn test_train_from_store() {
        let store = InMemoryStore::from_readings(daily_pattern(48));
        let service = EnergyIntelligence::default();

        let since = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        assert!(service.train_from_store(&store, 1, since).unwrap() > 0.0);

        // Unknown facility has no readings, which clears the model
        assert_eq!(service.train_from_store(&store, 99, since).unwrap(), 0.0);
        assert!(!service.predictor().is_trained());
    }

    #[test]
    fn test_recommendations_use_config() {
        let mut config = AnalyzerConfig::default();
        config.recommendations.load_warning_ratio = 0.5;
        let service = EnergyIntelligence::new(&config);

        let snapshot = Snapshot {
            energy_produced: 40.0,
            energy_consumed: 40.0,
            efficiency: 0.8,
            current_load: 60.0,
            capacity: Some(100.0),
        };
        let recs = service.get_ai_recommendations(&snapshot);
        assert_eq!(recs[0].key, "recommendation:load_high");
    }
}
