//! Database configuration
//!
//! Settings are read from `<db>/tracebase.toml` when that file exists and can
//! be overridden with [`DatabaseBuilder`](crate::DatabaseBuilder) methods.
//!
//! ```toml
//! durability = "strict"
//! buffered_flush_writes = 64
//! default_permission = "MANAGE"
//! max_search_results = 500
//! max_corrupt_wal_records = 0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracebase_durability::DurabilityMode;
use tracebase_security::Permission;

/// Name of the optional configuration file inside the database directory
pub const CONFIG_FILE_NAME: &str = "tracebase.toml";

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Config file path
        path: String,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// File is not valid TOML for [`DatabaseConfig`]
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Config file path
        path: String,
        /// Parser error
        source: toml::de::Error,
    },

    /// A value is out of range
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl From<ConfigError> for tracebase_core::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Invalid(reason) => tracebase_core::Error::invalid_argument(reason),
            other => tracebase_core::Error::service(other.to_string()),
        }
    }
}

/// Durability setting as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurabilitySetting {
    /// No WAL
    InMemory,
    /// fsync every `buffered_flush_writes` records
    #[default]
    Buffered,
    /// fsync every record
    Strict,
}

/// Tunables for one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// WAL sync policy
    pub durability: DurabilitySetting,
    /// Appends between syncs in buffered mode
    pub buffered_flush_writes: usize,
    /// Permission of principals without an explicit grant
    pub default_permission: Permission,
    /// Upper bound for `max_results` in trace search
    pub max_search_results: usize,
    /// Corrupt WAL records tolerated on open
    pub max_corrupt_wal_records: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            durability: DurabilitySetting::Buffered,
            buffered_flush_writes: 64,
            default_permission: Permission::Manage,
            max_search_results: 500,
            max_corrupt_wal_records: 0,
        }
    }
}

impl DatabaseConfig {
    /// Parse a config document
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: DatabaseConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<dir>/tracebase.toml`, or the defaults when it does not exist
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(DatabaseConfig::default());
        }
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;
        Self::from_toml_str(&text, &origin)
    }

    /// Reject values that cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffered_flush_writes == 0 {
            return Err(ConfigError::Invalid(
                "buffered_flush_writes must be at least 1".to_string(),
            ));
        }
        if self.max_search_results == 0 {
            return Err(ConfigError::Invalid(
                "max_search_results must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// WAL mode for these settings
    pub fn durability_mode(&self) -> DurabilityMode {
        match self.durability {
            DurabilitySetting::InMemory => DurabilityMode::InMemory,
            DurabilitySetting::Buffered => DurabilityMode::Buffered {
                max_pending: self.buffered_flush_writes,
            },
            DurabilitySetting::Strict => DurabilityMode::Strict,
        }
    }
}
