//! Runtime configuration for the core and its drivers.
//!
//! # Responsibility
//! - Resolve database path and logging settings from environment keys.
//!
//! # Invariants
//! - Resolution never touches the file system.
//! - Invalid values are reported, never silently replaced by defaults.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "WORLDCITIES_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "WORLDCITIES_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "WORLDCITIES_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "worldcities.sqlite3";

/// Resolved core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = read(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path.trim());
        }
        if let Some(level) = read(LOG_LEVEL_ENV) {
            config.log_level =
                normalize_level(&level).map_err(|err| format!("{LOG_LEVEL_ENV}: {err}"))?;
        }
        if let Some(dir) = read(LOG_DIR_ENV) {
            config.log_dir =
                Some(normalize_log_dir(&dir).map_err(|err| format!("{LOG_DIR_ENV}: {err}"))?);
        }

        Ok(config)
    }
}
