//! Per-user directories
//!
//! `~/.config/gh-pr-tracker/` and `~/.cache/gh-pr-tracker/` on Linux, the
//! platform equivalents from `dirs` elsewhere. Both are created on first use.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "gh-pr-tracker";

fn app_dir(base: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    let dir = base
        .with_context(|| format!("No {} directory on this platform", kind))?
        .join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    Ok(dir)
}

pub fn config_dir() -> Result<PathBuf> {
    app_dir(dirs::config_dir(), "config")
}

/// Where the watcher keeps its release-build log files
pub fn cache_dir() -> Result<PathBuf> {
    app_dir(dirs::cache_dir(), "cache")
}

/// `<config_dir>/config.toml`, the last config file candidate
pub fn app_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
