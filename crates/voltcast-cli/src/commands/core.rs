//! Shared utilities for loading configuration and readings

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use voltcast_core::{AnalyzerConfig, InMemoryStore, Reading, SampleStore};

/// Load the analyzer config (explicit path, data-dir override, or defaults)
pub fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    AnalyzerConfig::load(path).context("Failed to load configuration")
}

/// Load one facility's readings from a CSV file, oldest first
pub fn load_readings(data: &Path, facility: i64) -> Result<Vec<Reading>> {
    let store = InMemoryStore::from_csv_path(data)
        .with_context(|| format!("Failed to load readings from {}", data.display()))?;

    let readings = store.fetch_readings(facility, DateTime::<Utc>::MIN_UTC)?;
    if readings.is_empty() {
        warn!(
            facility,
            available = ?store.facilities(),
            "No readings for facility"
        );
    } else {
        debug!(facility, readings = readings.len(), "Loaded readings");
    }

    Ok(readings)
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
