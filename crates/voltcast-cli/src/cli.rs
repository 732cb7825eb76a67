//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Voltcast - Forecast facility energy consumption and spot trends
#[derive(Parser)]
#[command(name = "voltcast")]
#[command(about = "Energy consumption forecasting and trend analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Reading file (CSV)
    #[arg(long, default_value = "readings.csv", global = true)]
    pub data: PathBuf,

    /// Configuration file (defaults to the data-dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Facility to analyze
    #[arg(long, default_value = "1", global = true)]
    pub facility: i64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train on the reading file and forecast hourly consumption
    Forecast {
        /// Hours to forecast (defaults to forecast.default_horizon)
        #[arg(long)]
        horizon: Option<usize>,
    },

    /// Show per-metric trends
    Trends {
        /// Only use readings from the last N hours
        #[arg(long)]
        hours: Option<i64>,
    },

    /// Explain trends as insights
    Insights {
        /// Only use readings from the last N hours
        #[arg(long)]
        hours: Option<i64>,
    },

    /// Recommendations for the latest reading
    Recommend {
        /// Facility load capacity, in the same unit as current_load
        #[arg(long, default_value = "100")]
        capacity: f64,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Periodically re-train and forecast as the reading file grows
    Watch {
        /// Minutes between refreshes
        #[arg(long, default_value = "5")]
        interval_mins: u64,

        /// Hours to forecast (defaults to forecast.default_horizon)
        #[arg(long)]
        horizon: Option<usize>,

        /// Stop after this many refreshes
        #[arg(long)]
        count: Option<usize>,
    },
}
