//! Configuration file discovery and loading
//!
//! Bootstrap settings are resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! This module handles locating and parsing the TOML file. Each binary owns
//! the shape of its own config and merges the CLI/env tiers on top.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "VOTERSCORE_CONFIG";

/// Application directory name under the platform config/data dirs
pub const APP_DIR_NAME: &str = "voterscore";

/// Locate the TOML config file.
///
/// Returns `None` when no candidate exists; a missing config is not an error.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument (returned even if missing so the
    // loader reports it)
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config locations
    default_config_candidates()
        .into_iter()
        .find(|candidate| candidate.exists())
}

/// Candidate config file locations for the current platform, in search order
fn default_config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR_NAME).join("config.toml"));
    }

    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/voterscore/config.toml"));
    }

    candidates
}

/// Load and parse a TOML config file, falling back to `T::default()`.
///
/// - `None` path: defaults, logged at info
/// - path that does not exist: error (an explicitly named file must exist)
/// - unreadable or malformed file: error
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        warn!("Config file {} is empty, using compiled defaults", path.display());
        return Ok(T::default());
    }

    let config = toml::from_str::<T>(&content).map_err(|e| {
        Error::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME).join("voters.db"))
        .unwrap_or_else(|| PathBuf::from("./voterscore_data/voters.db"))
}
