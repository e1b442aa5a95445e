//! Centralized path management for scriptreel

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the scriptreel config directory
pub fn reel_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("scriptreel");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(reel_config_dir()?.join("config.toml"))
}

/// Root directory under which every run gets its own staging directory
pub fn default_staging_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("scriptreel")
        .join("runs")
}
