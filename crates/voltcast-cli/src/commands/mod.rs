//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config and reading loading, JSON output)
//! - `config` - Effective configuration dump
//! - `forecast` - Train and forecast consumption
//! - `recommend` - Recommendations for the latest reading
//! - `trends` - Trend table and trend insights
//! - `watch` - Periodic re-train + forecast loop

pub mod config;
pub mod core;
pub mod forecast;
pub mod recommend;
pub mod trends;
pub mod watch;

// Re-export command functions for main.rs
pub use config::*;
pub use core::*;
pub use forecast::*;
pub use recommend::*;
pub use trends::*;
pub use watch::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
