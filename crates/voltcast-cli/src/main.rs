//! Voltcast CLI - Energy forecasting and trend analysis
//!
//! Usage:
//!   voltcast forecast --horizon 24      Train and forecast hourly consumption
//!   voltcast trends --hours 48          Per-metric trend table
//!   voltcast insights                   Trend insights
//!   voltcast recommend --capacity 120   Recommendations for the latest reading
//!   voltcast watch --interval-mins 5    Periodic re-train + forecast

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Forecast { horizon } => {
            commands::cmd_forecast(&cli.data, config, cli.facility, horizon, cli.json)
        }
        Commands::Trends { hours } => {
            commands::cmd_trends(&cli.data, config, cli.facility, hours, cli.json)
        }
        Commands::Insights { hours } => {
            commands::cmd_insights(&cli.data, config, cli.facility, hours, cli.json)
        }
        Commands::Recommend { capacity } => {
            commands::cmd_recommend(&cli.data, config, cli.facility, capacity, cli.json)
        }
        Commands::Config => commands::cmd_config(config),
        Commands::Watch {
            interval_mins,
            horizon,
            count,
        } => {
            commands::cmd_watch(
                &cli.data,
                config,
                cli.facility,
                interval_mins,
                horizon,
                count,
                cli.json,
            )
            .await
        }
    }
}
