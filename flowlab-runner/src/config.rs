//! Refresh run configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file (or
//! no file at all) gives a usable KOSPI configuration. CLI flags override
//! individual fields after loading.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid start_date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("workers must be at least 1")]
    InvalidWorkers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Market the universe is filtered to (listing rows from other markets
    /// are dropped).
    pub market: String,

    /// First date of history requested per symbol (YYYY-MM-DD).
    pub start_date: String,

    /// Concurrent in-flight fetches.
    pub workers: usize,

    /// Root directory for all artifacts.
    pub output_dir: PathBuf,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            market: "KOSPI".into(),
            start_date: "2023-01-01".into(),
            workers: 10,
            output_dir: PathBuf::from("out"),
        }
    }
}

impl RefreshConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }
        self.start()?;
        Ok(())
    }

    /// Parsed start date.
    pub fn start(&self) -> Result<NaiveDate, ConfigError> {
        NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidDate(self.start_date.clone()))
    }
}
