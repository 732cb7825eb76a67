//! Forecast command implementation

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use voltcast_core::{EnergyIntelligence, Forecast, ForecastSource, ModelSummary};

use super::{load_config, load_readings, print_json};

#[derive(Serialize)]
struct ForecastOutput<'a> {
    facility_id: i64,
    readings: usize,
    fit_score: f64,
    model: Option<ModelSummary>,
    forecast: &'a Forecast,
}

pub fn cmd_forecast(
    data: &Path,
    config_path: Option<&Path>,
    facility: i64,
    horizon: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let horizon = horizon.unwrap_or(config.forecast.default_horizon);
    let readings = load_readings(data, facility)?;

    let service = EnergyIntelligence::new(&config);
    let fit_score = service.train(&readings);
    let forecast = service.forecast(&readings, horizon);

    if json {
        return print_json(&ForecastOutput {
            facility_id: facility,
            readings: readings.len(),
            fit_score,
            model: service.predictor().model_summary(),
            forecast: &forecast,
        });
    }

    println!();
    println!("⚡ Consumption Forecast (facility {})", facility);
    println!("   ─────────────────────────────────────────────");
    println!("   Readings:  {}", readings.len());
    match service.predictor().model_summary() {
        Some(summary) => {
            println!(
                "   Model:     {} samples, {} features, fit {:.3}",
                summary.training_samples, summary.feature_count, summary.fit_score
            );
            println!(
                "   Trained through {}",
                summary.trained_through.format("%Y-%m-%d %H:%M UTC")
            );
        }
        None => println!("   Model:     not trained"),
    }
    println!("   Source:    {}", describe_source(forecast.source));
    println!();

    print_forecast_table(&forecast);
    Ok(())
}

pub(crate) fn describe_source(source: ForecastSource) -> &'static str {
    match source {
        ForecastSource::Model => "regression model",
        ForecastSource::LastObserved => "last observed value (baseline)",
        ForecastSource::Default => "configured default (no readings)",
    }
}

pub(crate) fn print_forecast_table(forecast: &Forecast) {
    println!("   {:>5}  {:<17}  {:>10}", "+h", "Time (UTC)", "kWh");
    for point in &forecast.points {
        let time = point
            .timestamp
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("   {:>5}  {:<17}  {:>10.2}", point.hours_ahead, time, point.value);
    }

    let total: f64 = forecast.points.iter().map(|p| p.value).sum();
    println!("   ─────────────────────────────────────────────");
    println!("   Total: {:.2} kWh over {}h", total, forecast.points.len());
    println!();
}
