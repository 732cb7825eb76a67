//! Integration tests for voltcast-core
//!
//! These tests exercise the full load → train → forecast → trends → insights
//! workflow through the public API.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use voltcast_core::{
    AnalyzerConfig, EnergyIntelligence, ForecastSource, InMemoryStore, Metric, NewReading,
    Reading, SampleStore, Severity, Snapshot, TrendDirection,
};

fn start() -> DateTime<Utc> {
    // Monday
    Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
}

/// Three days of hourly readings with a daily consumption cycle
fn facility_csv() -> String {
    let mut csv =
        String::from("timestamp,energy_produced,energy_consumed,efficiency,current_load,facility_id\n");
    for i in 0..72i64 {
        let hour = (i % 24) as f64;
        let daylight = (hour / 24.0 * std::f64::consts::TAU - std::f64::consts::FRAC_PI_2)
            .sin()
            .max(0.0);
        let produced = 40.0 * daylight;
        let consumed = 30.0 + 12.0 * (hour / 24.0 * std::f64::consts::TAU).cos() + (i % 5) as f64;
        let ts = start() + Duration::hours(i);
        csv.push_str(&format!(
            "{},{:.2},{:.2},0.85,{:.1},1\n",
            ts.to_rfc3339(),
            produced,
            consumed,
            consumed * 1.5
        ));
    }
    csv
}

fn linear_consumption(n: i64) -> Vec<Reading> {
    (0..n)
        .map(|i| Reading::new(start() + Duration::hours(i), 25.0, 10.0 + i as f64, 0.8, 60.0, 1))
        .collect()
}

// =============================================================================
// Forecasting
// =============================================================================

#[test]
fn test_train_and_forecast_from_csv() {
    let store = InMemoryStore::from_reader(facility_csv().as_bytes()).unwrap();
    let readings = store.fetch_readings(1, start()).unwrap();
    assert_eq!(readings.len(), 72);

    let service = EnergyIntelligence::default();
    let score = service.train(&readings);
    assert!((0.0..=1.0).contains(&score));
    assert!(score > 0.5, "daily cycle should be learnable, got {}", score);

    let forecast = service.forecast(&readings, 24);
    assert_eq!(forecast.points.len(), 24);
    assert_eq!(forecast.source, ForecastSource::Model);
    assert_eq!(forecast.points[0].timestamp, Some(start() + Duration::hours(72)));
    assert!(forecast.values().iter().all(|v| v.is_finite() && *v >= 0.0));
}

#[test]
fn test_predict_empty_returns_baseline() {
    let service = EnergyIntelligence::default();
    let values = service.predict(&[], 24);
    assert_eq!(values, vec![service.config().forecast.baseline_default; 24]);
}

#[test]
fn test_below_min_samples_clears_model() {
    let service = EnergyIntelligence::default();
    let min = service.config().training.min_samples as i64;

    assert!(service.train(&linear_consumption(min + 30)) > 0.0);
    assert!(service.predictor().is_trained());

    let short = linear_consumption(min - 1);
    assert_eq!(service.train(&short), 0.0);
    assert!(!service.predictor().is_trained());

    let forecast = service.forecast(&short, 3);
    assert_eq!(forecast.source, ForecastSource::LastObserved);
    assert_eq!(forecast.values(), vec![10.0 + (min - 2) as f64; 3]);
}

#[test]
fn test_constant_consumption_still_forecasts() {
    let readings: Vec<Reading> = (0..40)
        .map(|i| Reading::new(start() + Duration::hours(i), 5.0, 12.0, 0.5, 10.0, 1))
        .collect();
    let service = EnergyIntelligence::default();

    let score = service.train(&readings);
    assert!((0.0..=1.0).contains(&score));

    let values = service.predict(&readings, 24);
    assert_eq!(values.len(), 24);
    assert!(values.iter().all(|v| (v - 12.0).abs() < 1e-3));
}

#[test]
fn test_concurrent_retrain_and_forecast() {
    let service = Arc::new(EnergyIntelligence::default());
    let readings = Arc::new(linear_consumption(60));

    std::thread::scope(|scope| {
        for i in 0..4 {
            let service = Arc::clone(&service);
            let readings = Arc::clone(&readings);
            scope.spawn(move || {
                for _ in 0..10 {
                    if i % 2 == 0 {
                        service.train(&readings);
                    } else {
                        assert_eq!(service.predict(&readings, 12).len(), 12);
                    }
                }
            });
        }
    });

    assert!(service.predictor().is_trained());
}

// =============================================================================
// Trends and Insights
// =============================================================================

#[test]
fn test_linear_consumption_trend() {
    let service = EnergyIntelligence::default();
    let readings = linear_consumption(25);

    let trends = service.analyze_trends(&readings);
    let consumed = &trends[&Metric::EnergyConsumed];
    assert_eq!(consumed.direction, TrendDirection::Rising);
    assert!((consumed.slope - 1.0).abs() < 1e-9);
    assert!(consumed.volatility < 1e-9);

    assert_eq!(trends, service.analyze_trends(&readings));

    let insights = service.get_trend_insights(&trends);
    assert_eq!(insights[0].source_metric, Some(Metric::EnergyConsumed));
    assert_eq!(insights[0].severity, Severity::Warning);
}

#[test]
fn test_trends_window_from_store() {
    let store = InMemoryStore::from_reader(facility_csv().as_bytes()).unwrap();
    let readings = store.fetch_readings(1, start()).unwrap();
    let service = EnergyIntelligence::default();

    let day = service.analyze_trends_window(&readings, 24);
    assert_eq!(day[&Metric::CurrentLoad].window_size, 25);
    assert!(day.values().all(|r| r.direction != TrendDirection::InsufficientData));
}

#[test]
fn test_insufficient_history_yields_single_insight() {
    let service = EnergyIntelligence::default();
    let trends = service.analyze_trends(&linear_consumption(1));
    let insights = service.get_trend_insights(&trends);

    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].severity, Severity::Info);
}

// =============================================================================
// Recommendations
// =============================================================================

#[test]
fn test_high_load_recommendation_from_latest_reading() {
    let store = InMemoryStore::new();
    store
        .append(
            3,
            NewReading {
                energy_produced: 50.0,
                energy_consumed: 50.0,
                current_load: 90.0,
                efficiency: Some(0.40),
                timestamp: None,
            },
            start(),
        )
        .unwrap();

    let latest = store.latest_reading(3).unwrap();
    let snapshot = Snapshot::from_reading(&latest, Some(100.0));
    let service = EnergyIntelligence::default();

    let recs = service.get_ai_recommendations(&snapshot);
    let high_load = recs
        .iter()
        .find(|r| r.severity == Severity::Warning && r.source_metric == Some(Metric::CurrentLoad))
        .expect("high-load warning");
    assert!(high_load.message.contains("90.0"));
    assert!(high_load.message.contains("100.0"));

    assert_eq!(recs, service.get_ai_recommendations(&snapshot));
}

#[test]
fn test_custom_thresholds_from_toml() {
    let config = AnalyzerConfig::from_toml_str(
        r#"
[recommendations]
load_warning_ratio = 0.5
critical_load_ratio = 0.6
"#,
    )
    .unwrap();
    let service = EnergyIntelligence::new(&config);

    let snapshot = Snapshot {
        energy_produced: 10.0,
        energy_consumed: 10.0,
        efficiency: 0.8,
        current_load: 65.0,
        capacity: Some(100.0),
    };
    let recs = service.get_ai_recommendations(&snapshot);
    assert_eq!(recs[0].severity, Severity::Alert);
}
