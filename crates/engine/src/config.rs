//! Configuration via `linkstore.toml`
//!
//! A default `linkstore.toml` is written into the data directory on first
//! use. Every key is optional; missing keys take their defaults.

use linkstore_storage::{SqliteOptions, SqliteStore, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file name placed in the data directory.
pub const CONFIG_FILE_NAME: &str = "linkstore.toml";

/// Default database file name, relative to the data directory.
pub const DEFAULT_DATABASE_FILE: &str = "linkstore.db";

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("config file '{path}': {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config content is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config parsed but holds values that cannot be used
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `[sqlite]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database file; relative paths resolve against the data directory
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds (default: 5000)
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_FILE)
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// `[listing]` section
///
/// A page request with limit 0 gets `default_limit`; larger requests are
/// clamped to `max_limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Page size when the caller asks for none (default: 50)
    #[serde(default = "default_limit")]
    pub default_limit: u64,
    /// Largest page ever returned (default: 500)
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

fn default_limit() -> u64 {
    50
}

fn default_max_limit() -> u64 {
    500
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl ListingConfig {
    /// Effective limit for a requested one
    pub fn effective_limit(&self, requested: u64) -> u64 {
        if requested == 0 {
            self.default_limit
        } else {
            requested.min(self.max_limit)
        }
    }
}

/// Configuration loaded from `linkstore.toml`.
///
/// # Example
///
/// ```toml
/// [sqlite]
/// path = "linkstore.db"
/// busy_timeout_ms = 5000
///
/// [listing]
/// default_limit = 50
/// max_limit = 500
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStoreConfig {
    /// SQLite store settings
    #[serde(default)]
    pub sqlite: SqliteConfig,
    /// Listing window settings
    #[serde(default)]
    pub listing: ListingConfig,
}

impl LinkStoreConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# linkstore configuration

[sqlite]
# Database file, relative to this directory unless absolute
path = "linkstore.db"
# How long a writer waits on a locked database, in milliseconds
busy_timeout_ms = 5000

[listing]
# Page size used when a caller requests limit 0
default_limit = 50
# Requests above this are clamped
max_limit = 500
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LinkStoreConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config into `dir` if none exists there.
    ///
    /// Returns the config file path whether it was created or already existed.
    pub fn write_default_if_missing(dir: &Path) -> Result<PathBuf, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            std::fs::write(&path, Self::default_toml()).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(path)
    }

    /// Check that listing limits are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let listing = &self.listing;
        if listing.default_limit == 0 || listing.max_limit == 0 {
            return Err(ConfigError::Invalid(
                "listing limits must be positive".to_string(),
            ));
        }
        if listing.default_limit > listing.max_limit {
            return Err(ConfigError::Invalid(format!(
                "listing.default_limit ({}) exceeds listing.max_limit ({})",
                listing.default_limit, listing.max_limit
            )));
        }
        Ok(())
    }

    /// Connection options for the SQLite store
    pub fn sqlite_options(&self) -> SqliteOptions {
        SqliteOptions {
            busy_timeout: Duration::from_millis(self.sqlite.busy_timeout_ms),
        }
    }

    /// Database path with relative paths resolved against `base_dir`
    pub fn database_path(&self, base_dir: &Path) -> PathBuf {
        if self.sqlite.path.is_absolute() {
            self.sqlite.path.clone()
        } else {
            base_dir.join(&self.sqlite.path)
        }
    }

    /// Open the configured SQLite store
    pub fn open_sqlite(&self, base_dir: &Path) -> StoreResult<SqliteStore> {
        SqliteStore::open_with(self.database_path(base_dir), &self.sqlite_options())
    }
}
