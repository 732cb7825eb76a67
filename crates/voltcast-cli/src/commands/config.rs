//! Config command implementation

use std::path::Path;

use anyhow::{Context, Result};
use voltcast_core::config::default_config_path;

use super::load_config;

pub fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let toml = config
        .to_toml_string()
        .context("Failed to render configuration")?;

    match config_path {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => match default_config_path() {
            Some(path) if path.exists() => println!("# Loaded from {}", path.display()),
            Some(path) => println!("# Built-in defaults (override at {})", path.display()),
            None => println!("# Built-in defaults"),
        },
    }
    println!("{}", toml);

    Ok(())
}
