// crates/tablekit-config/src/config.rs
// ============================================================================
// Module: Tablekit Configuration
// Description: Configuration loading and validation for tablekit stores.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, tablekit-core, tablekit-store-sqlite, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The `[store]` table configures the `SQLite` backend and the `[query]` table
//! configures the filter compiler. Unknown keys and out-of-range values are
//! rejected rather than ignored.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use tablekit_core::CompileOptions;
use tablekit_core::DEFAULT_MAX_FILTERS;
use tablekit_core::Dialect;
use tablekit_core::MAX_FILTERS_LIMIT;
use tablekit_core::check_path_limits;
use tablekit_store_sqlite::SqliteStoreConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub(crate) const DEFAULT_CONFIG_NAME: &str = "tablekit.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TABLEKIT_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Database file used when `[store]` is omitted.
const DEFAULT_STORE_PATH: &str = "tablekit.db";

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level tablekit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TablekitConfig {
    /// `SQLite` store configuration.
    #[serde(default = "default_store_config")]
    pub store: SqliteStoreConfig,
    /// Filter compiler configuration.
    #[serde(default)]
    pub query: QueryConfig,
}

impl Default for TablekitConfig {
    fn default() -> Self {
        Self {
            store: default_store_config(),
            query: QueryConfig::default(),
        }
    }
}

impl TablekitConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is taken from `path`, then from `TABLEKIT_CONFIG`, then
    /// defaults to `tablekit.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parses and validates configuration from raw file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bytes exceed the size limit, are not
    /// UTF-8, fail to parse, or fail validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate().map_err(|err| ConfigError::Invalid(format!("store: {err}")))?;
        self.query.validate()
    }

    /// Returns the filter compiler limits for this configuration.
    #[must_use]
    pub const fn compile_options(&self) -> CompileOptions {
        self.query.compile_options()
    }
}

/// Filter compiler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Placeholder style for rendered statements.
    #[serde(default)]
    pub dialect: Dialect,
    /// Maximum number of filters accepted in one read.
    #[serde(default = "default_max_filters")]
    pub max_filters: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_filters: DEFAULT_MAX_FILTERS,
        }
    }
}

impl QueryConfig {
    /// Validates compiler limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `max_filters` is outside
    /// `1 ..= MAX_FILTERS_LIMIT`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_filters == 0 || self.max_filters > MAX_FILTERS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "query.max_filters out of range: {} (expected 1..={MAX_FILTERS_LIMIT})",
                self.max_filters
            )));
        }
        Ok(())
    }

    /// Returns the equivalent compiler options.
    #[must_use]
    pub const fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            max_filters: self.max_filters,
        }
    }
}

/// Returns the default store configuration.
fn default_store_config() -> SqliteStoreConfig {
    SqliteStoreConfig::new(DEFAULT_STORE_PATH)
}

/// Returns the default filter limit.
const fn default_max_filters() -> usize {
    DEFAULT_MAX_FILTERS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path or the environment value.
pub(crate) fn resolve_path(
    path: Option<&Path>,
    env_path: Option<String>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = env_path {
        let env_path = PathBuf::from(env_path);
        validate_path(&env_path)?;
        return Ok(env_path);
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against the shared path limits.
pub(crate) fn validate_path(path: &Path) -> Result<(), ConfigError> {
    check_path_limits(path).map_err(|err| ConfigError::Invalid(format!("config path {err}")))
}
