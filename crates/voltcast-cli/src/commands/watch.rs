//! Watch command implementation
//!
//! A background task re-reads the reading file on an interval and re-trains
//! the shared predictor. The foreground forecasts from each refresh while the
//! next one may already be training; the predictor's lock keeps every
//! forecast on one consistent model.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};
use voltcast_core::{EnergyIntelligence, Forecast, Reading};

use super::forecast::{describe_source, print_forecast_table};
use super::{load_config, load_readings, print_json};

/// Result of one background re-train
struct Refresh {
    readings: Vec<Reading>,
    fit_score: f64,
}

#[derive(Serialize)]
struct WatchOutput<'a> {
    run: usize,
    readings: usize,
    fit_score: f64,
    forecast: &'a Forecast,
}

pub async fn cmd_watch(
    data: &Path,
    config_path: Option<&Path>,
    facility: i64,
    interval_mins: u64,
    horizon: Option<usize>,
    count: Option<usize>,
    json: bool,
) -> Result<()> {
    if !data.exists() {
        bail!("Reading file not found: {}", data.display());
    }

    let config = load_config(config_path)?;
    let horizon = horizon.unwrap_or(config.forecast.default_horizon);
    let service = Arc::new(EnergyIntelligence::new(&config));
    let period = Duration::from_secs(interval_mins.max(1) * 60);

    info!(
        "Watching {} for facility {}: re-training every {} min",
        data.display(),
        facility,
        interval_mins.max(1)
    );

    let (tx, mut rx) = mpsc::channel(1);
    let retrainer = start_retrainer(Arc::clone(&service), data.to_path_buf(), facility, period, tx);

    let mut runs = 0usize;
    loop {
        tokio::select! {
            refresh = rx.recv() => {
                let Some(refresh) = refresh else {
                    break;
                };
                runs += 1;

                let forecast = service.forecast(&refresh.readings, horizon);
                if json {
                    print_json(&WatchOutput {
                        run: runs,
                        readings: refresh.readings.len(),
                        fit_score: refresh.fit_score,
                        forecast: &forecast,
                    })?;
                } else {
                    println!();
                    println!(
                        "🔄 Refresh #{} - {} readings, fit {:.3}, source: {}",
                        runs,
                        refresh.readings.len(),
                        refresh.fit_score,
                        describe_source(forecast.source)
                    );
                    print_forecast_table(&forecast);
                }

                if count.is_some_and(|limit| runs >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                break;
            }
        }
    }

    retrainer.abort();
    Ok(())
}

/// Spawn the periodic re-train task
///
/// The first refresh runs immediately. The task ends when the receiver is
/// dropped.
fn start_retrainer(
    service: Arc<EnergyIntelligence>,
    data: PathBuf,
    facility: i64,
    period: Duration,
    tx: mpsc::Sender<Refresh>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);

        loop {
            ticker.tick().await;

            let readings = match load_readings(&data, facility) {
                Ok(readings) => readings,
                Err(e) => {
                    error!("Failed to reload readings: {:#}", e);
                    continue;
                }
            };

            let fit_score = service.train(&readings);
            info!(readings = readings.len(), fit_score, "Re-trained consumption model");

            if tx.send(Refresh { readings, fit_score }).await.is_err() {
                break;
            }
        }
    })
}
