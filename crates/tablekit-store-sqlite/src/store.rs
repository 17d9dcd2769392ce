// crates/tablekit-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Entity Store
// Description: Connection ownership, pragmas, schema bootstrap, transactions.
// Purpose: Give entity operations a configured connection and a transaction
//          owner that commits on success and rolls back on failure.
// Dependencies: rusqlite, serde, tablekit-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteEntityStore`] opens one `SQLite` connection with hardened pragmas,
//! sizes its prepared-statement cache so every registered statement stays
//! resident, and serializes units of work behind a mutex. Each call to
//! [`SqliteEntityStore::transaction`] begins a transaction (IMMEDIATE by
//! default, so check-then-insert sequences hold the writer lock), hands the
//! closure an [`EntityTx`], and commits or rolls back on its result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::InterruptHandle;
use rusqlite::OpenFlags;
use rusqlite::TransactionBehavior;
use serde::Deserialize;
use tablekit_core::CompileOptions;
use tablekit_core::EntityError;
use tablekit_core::EntityMetrics;
use tablekit_core::NoopMetrics;
use tablekit_core::StatementRegistry;
use tablekit_core::check_path_limits;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::context::EntityTx;
use crate::schema::Schema;
use crate::schema::initialize_schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum accepted busy timeout (ms).
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;
/// Default prepared-statement cache capacity.
const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 64;
/// Upper bound for the configured statement cache capacity.
pub const MAX_STATEMENT_CACHE_CAPACITY: usize = 4_096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Lock acquisition mode used when a unit of work begins.
///
/// # Invariants
/// - Values map 1:1 to `BEGIN DEFERRED|IMMEDIATE|EXCLUSIVE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteTransactionBehavior {
    /// Acquire locks lazily on first access.
    Deferred,
    /// Acquire the writer lock at BEGIN.
    #[default]
    Immediate,
    /// Acquire an exclusive lock at BEGIN.
    Exclusive,
}

impl SqliteTransactionBehavior {
    /// Returns the `rusqlite` transaction behavior.
    #[must_use]
    pub const fn to_rusqlite(self) -> TransactionBehavior {
        match self {
            Self::Deferred => TransactionBehavior::Deferred,
            Self::Immediate => TransactionBehavior::Immediate,
            Self::Exclusive => TransactionBehavior::Exclusive,
        }
    }

    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deferred => "deferred",
            Self::Immediate => "immediate",
            Self::Exclusive => "exclusive",
        }
    }
}

/// Configuration for the `SQLite` entity store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `statement_cache_capacity` is within `1..=MAX_STATEMENT_CACHE_CAPACITY`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Minimum prepared-statement cache capacity.
    #[serde(default = "default_statement_cache_capacity")]
    pub statement_cache_capacity: usize,
    /// Transaction begin behavior.
    #[serde(default)]
    pub transaction_behavior: SqliteTransactionBehavior,
}

impl SqliteStoreConfig {
    /// Creates a configuration for `path` with default settings.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
            transaction_behavior: SqliteTransactionBehavior::default(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when a value is out of range or
    /// the path is unusable.
    pub fn validate(&self) -> Result<(), SqliteStoreError> {
        validate_store_path(&self.path)?;
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(SqliteStoreError::Invalid(format!(
                "busy_timeout_ms out of range: {} (max {MAX_BUSY_TIMEOUT_MS})",
                self.busy_timeout_ms
            )));
        }
        if self.statement_cache_capacity == 0
            || self.statement_cache_capacity > MAX_STATEMENT_CACHE_CAPACITY
        {
            return Err(SqliteStoreError::Invalid(format!(
                "statement_cache_capacity out of range: {} (max {MAX_STATEMENT_CACHE_CAPACITY})",
                self.statement_cache_capacity
            )));
        }
        Ok(())
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default prepared-statement cache capacity.
const fn default_statement_cache_capacity() -> usize {
    DEFAULT_STATEMENT_CACHE_CAPACITY
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding row contents.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for EntityError {
    fn from(error: SqliteStoreError) -> Self {
        Self::store("sqlite store", error)
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// SQLite-backed entity store.
///
/// # Invariants
/// - One unit of work uses the connection at a time.
/// - The statement cache holds at least every registered statement.
pub struct SqliteEntityStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Serialized connection.
    connection: Mutex<Connection>,
    /// Registered statements shared with every unit of work.
    registry: Arc<StatementRegistry>,
    /// Operation metrics sink.
    metrics: Arc<dyn EntityMetrics>,
    /// Filter compiler limits.
    options: CompileOptions,
    /// Aborts in-flight statements from another thread.
    interrupt: InterruptHandle,
}

impl SqliteEntityStore {
    /// Opens an `SQLite`-backed entity store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the configuration is invalid or the
    /// database cannot be opened.
    pub fn open(
        config: SqliteStoreConfig,
        registry: Arc<StatementRegistry>,
    ) -> Result<Self, SqliteStoreError> {
        config.validate()?;
        ensure_parent_dir(&config.path)?;
        let capacity = config.statement_cache_capacity.max(registry.len());
        let connection = open_connection(&config, capacity)?;
        let interrupt = connection.get_interrupt_handle();
        debug!(
            path = %config.path.display(),
            statements = registry.len(),
            cache_capacity = capacity,
            transaction_behavior = config.transaction_behavior.as_str(),
            "opened sqlite entity store"
        );
        Ok(Self {
            config,
            connection: Mutex::new(connection),
            registry,
            metrics: Arc::new(NoopMetrics),
            options: CompileOptions::default(),
            interrupt,
        })
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn EntityMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replaces the filter compiler limits.
    #[must_use]
    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Returns the shared statement registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<StatementRegistry> {
        &self.registry
    }

    /// Creates or validates the versioned schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when schema creation fails or the stored
    /// version is newer than `schema`.
    pub fn apply_schema(&self, schema: &Schema) -> Result<(), SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
        initialize_schema(&mut guard, schema)
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
        guard
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Aborts the statement currently executing on the store's connection.
    ///
    /// The interrupted operation fails with [`EntityError::Cancelled`]. A
    /// no-op when nothing is running.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    /// Runs `work` inside a transaction.
    ///
    /// Commits when `work` returns `Ok` and rolls back when it returns `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or [`EntityError::Store`] when
    /// the transaction cannot begin or commit.
    pub fn transaction<T, F>(&self, work: F) -> Result<T, EntityError>
    where
        F: FnOnce(&EntityTx<'_>) -> Result<T, EntityError>,
    {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| EntityError::store("Failed to begin transaction", "sqlite connection mutex poisoned"))?;
        let tx = guard
            .transaction_with_behavior(self.config.transaction_behavior.to_rusqlite())
            .map_err(|err| EntityError::store("Failed to begin transaction", err))?;
        let result = {
            let entity_tx = EntityTx::new(&tx, &self.registry)
                .with_metrics(self.metrics.as_ref())
                .with_compile_options(self.options);
            work(&entity_tx)
        };
        match result {
            Ok(value) => {
                tx.commit().map_err(|err| EntityError::store("Failed to commit transaction", err))?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "sqlite rollback failed");
                }
                Err(error)
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates the store path: shared length limits, and never a directory.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    check_path_limits(path).map_err(|err| SqliteStoreError::Invalid(format!("store path {err}")))?;
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens the store connection, applies pragmas, and sizes the statement
/// cache to `cache_capacity`.
fn open_connection(
    config: &SqliteStoreConfig,
    cache_capacity: usize,
) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let pragmas = [
        ("foreign_keys", "on"),
        ("journal_mode", config.journal_mode.pragma_value()),
        ("synchronous", config.sync_mode.pragma_value()),
    ];
    for (pragma, value) in pragmas {
        connection
            .execute_batch(&format!("PRAGMA {pragma} = {value};"))
            .map_err(|err| SqliteStoreError::Db(format!("PRAGMA {pragma}: {err}")))?;
    }
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(format!("busy_timeout: {err}")))?;
    connection.set_prepared_statement_cache_capacity(cache_capacity);
    Ok(connection)
}
