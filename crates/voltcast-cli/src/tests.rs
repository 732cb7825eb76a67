//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::PathBuf;

use chrono::{Duration, TimeZone, Utc};
use tempfile::{NamedTempFile, TempDir};

use crate::commands::{self, truncate};

/// Write `hours` hourly readings for facilities 1 and 2 to a temp CSV
fn write_readings(hours: i64) -> NamedTempFile {
    let start = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "timestamp,energy_produced,energy_consumed,efficiency,current_load,facility_id"
    )
    .unwrap();

    for i in 0..hours {
        let ts = (start + Duration::hours(i)).to_rfc3339();
        let hour = (i % 24) as f64;
        let consumed = 30.0 + 10.0 * (hour / 24.0 * std::f64::consts::TAU).sin();
        writeln!(file, "{},20.0,{:.2},0.82,{:.1},1", ts, consumed, 60.0 + i as f64 * 0.5).unwrap();
        writeln!(file, "{},35.0,15.0,,92.0,2", ts).unwrap();
    }
    file.flush().unwrap();
    file
}

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("voltcast.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

// ========== Loading Tests ==========

#[test]
fn test_load_readings_filters_facility() {
    let file = write_readings(30);
    let readings = commands::load_readings(file.path(), 2).unwrap();
    assert_eq!(readings.len(), 30);
    assert!(readings.iter().all(|r| r.facility_id == 2));

    // Missing efficiency is derived from produced/consumed
    assert!((readings[0].efficiency - 15.0 / 35.0).abs() < 1e-9);
}

#[test]
fn test_load_readings_unknown_facility_is_empty() {
    let file = write_readings(5);
    let readings = commands::load_readings(file.path(), 42).unwrap();
    assert!(readings.is_empty());
}

#[test]
fn test_load_readings_missing_file() {
    let result = commands::load_readings(&PathBuf::from("/nonexistent/readings.csv"), 1);
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("/nonexistent/readings.csv"));
}

#[test]
fn test_load_config_explicit_path() {
    let (_dir, path) = write_config("[forecast]\ndefault_horizon = 6\n");
    let config = commands::load_config(Some(&path)).unwrap();
    assert_eq!(config.forecast.default_horizon, 6);
    assert_eq!(config.training.min_samples, 24);
}

#[test]
fn test_load_config_invalid() {
    let (_dir, path) = write_config("[trend]\nslope_epsilon = -1.0\n");
    assert!(commands::load_config(Some(&path)).is_err());
}

// ========== Command Tests ==========

#[test]
fn test_cmd_forecast() {
    let file = write_readings(72);
    assert!(commands::cmd_forecast(file.path(), None, 1, Some(12), false).is_ok());
    assert!(commands::cmd_forecast(file.path(), None, 1, None, true).is_ok());
}

#[test]
fn test_cmd_forecast_without_readings_uses_default() {
    let file = write_readings(3);
    // Facility 9 has no readings; forecasting still succeeds
    assert!(commands::cmd_forecast(file.path(), None, 9, Some(4), false).is_ok());
}

#[test]
fn test_cmd_trends_and_insights() {
    let file = write_readings(48);
    assert!(commands::cmd_trends(file.path(), None, 1, None, false).is_ok());
    assert!(commands::cmd_trends(file.path(), None, 1, Some(12), true).is_ok());
    assert!(commands::cmd_insights(file.path(), None, 1, Some(24), false).is_ok());
    assert!(commands::cmd_insights(file.path(), None, 2, None, true).is_ok());
}

#[test]
fn test_cmd_recommend() {
    let file = write_readings(4);
    assert!(commands::cmd_recommend(file.path(), None, 2, 100.0, false).is_ok());
    assert!(commands::cmd_recommend(file.path(), None, 1, 100.0, true).is_ok());
}

#[test]
fn test_cmd_recommend_errors() {
    let file = write_readings(4);
    assert!(commands::cmd_recommend(file.path(), None, 1, 0.0, false).is_err());
    assert!(commands::cmd_recommend(file.path(), None, 1, f64::NAN, false).is_err());

    let err = commands::cmd_recommend(file.path(), None, 7, 100.0, false).unwrap_err();
    assert!(err.to_string().contains("No readings for facility 7"));
}

#[test]
fn test_cmd_config() {
    assert!(commands::cmd_config(None).is_ok());

    let (_dir, path) = write_config("[insights]\nvolatility_ratio = 0.4\n");
    assert!(commands::cmd_config(Some(&path)).is_ok());

    let missing = PathBuf::from("/nonexistent/voltcast.toml");
    assert!(commands::cmd_config(Some(&missing)).is_err());
}

#[tokio::test]
async fn test_cmd_watch_single_refresh() {
    let file = write_readings(48);
    let result = commands::cmd_watch(file.path(), None, 1, 1, Some(6), Some(1), false).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_watch_missing_file() {
    let missing = PathBuf::from("/nonexistent/readings.csv");
    let result = commands::cmd_watch(&missing, None, 1, 1, None, Some(1), true).await;
    assert!(result.is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a longer message", 10), "a longe...");
    assert_eq!(truncate("⚡⚡⚡⚡⚡⚡", 5), "⚡⚡...");
}
