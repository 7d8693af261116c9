//! Configuration for the voterscore job
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (handled by clap)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! See `voterscore_common::config` for config file discovery.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use voterscore_common::{Error, Result};

use crate::scoring::ScoringConfig;
use crate::services::batch_updater::DEFAULT_BATCH_SIZE;
use crate::services::Pagination;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database: DatabaseConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
    pub scoring: ScoringConfig,
}

/// `[database]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; falls back to the platform data directory
    pub path: Option<PathBuf>,
}

/// `[batch]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_size: u32,
    pub pagination: Pagination,
    pub bulk_update_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pagination: Pagination::Keyset,
            bulk_update_timeout_ms: 30_000,
        }
    }
}

impl BatchConfig {
    pub fn bulk_update_timeout(&self) -> Duration {
        Duration::from_millis(self.bulk_update_timeout_ms)
    }
}

/// `[logging]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub batch_size: Option<u32>,
    pub pagination: Option<Pagination>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Layer CLI/env values over the file values
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(path) = overrides.database {
            self.database.path = Some(path);
        }
        if let Some(size) = overrides.batch_size {
            self.batch.batch_size = size;
        }
        if let Some(pagination) = overrides.pagination {
            self.batch.pagination = pagination;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(voterscore_common::config::default_database_path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        if self.batch.bulk_update_timeout_ms == 0 {
            return Err(Error::Config(
                "bulk_update_timeout_ms must be at least 1".to_string(),
            ));
        }
        self.scoring.validate()
    }
}
