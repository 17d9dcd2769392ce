// crates/tablekit-store-sqlite/src/context.rs
// ============================================================================
// Module: Entity Transaction Context
// Description: Connection-scoped view used by entity operations.
// Purpose: Resolve registered statement handles to cached prepared
//          statements and carry metrics and compiler limits.
// Dependencies: rusqlite, tablekit-core, tracing
// ============================================================================

//! ## Overview
//! [`EntityTx`] borrows a connection (usually an open transaction) together
//! with the shared [`StatementRegistry`]. Statements are prepared lazily
//! through the connection's statement cache, so repeated operations within
//! and across transactions reuse the same prepared statement.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::CachedStatement;
use rusqlite::Connection;
use rusqlite::InterruptHandle;
use tablekit_core::CompileOptions;
use tablekit_core::Entity;
use tablekit_core::EntityError;
use tablekit_core::EntityMetrics;
use tablekit_core::EntityStatements;
use tablekit_core::NoopMetrics;
use tablekit_core::StatementHandle;
use tablekit_core::StatementRegistry;
use tracing::trace;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Metrics sink used when none is supplied.
static NOOP_METRICS: NoopMetrics = NoopMetrics;

// ============================================================================
// SECTION: Entity Transaction
// ============================================================================

/// Connection-scoped context for entity operations.
///
/// # Invariants
/// - Never commits or rolls back the borrowed connection.
/// - Used by one operation at a time.
pub struct EntityTx<'a> {
    /// Borrowed connection or transaction.
    conn: &'a Connection,
    /// Shared statement registry.
    registry: &'a StatementRegistry,
    /// Operation metrics sink.
    metrics: &'a dyn EntityMetrics,
    /// Filter compiler limits.
    options: CompileOptions,
}

impl<'a> EntityTx<'a> {
    /// Creates a context over `conn` using `registry`.
    #[must_use]
    pub fn new(conn: &'a Connection, registry: &'a StatementRegistry) -> Self {
        Self {
            conn,
            registry,
            metrics: &NOOP_METRICS,
            options: CompileOptions::default(),
        }
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: &'a dyn EntityMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Replaces the filter compiler limits.
    #[must_use]
    pub const fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the borrowed connection.
    #[must_use]
    pub const fn connection(&self) -> &'a Connection {
        self.conn
    }

    /// Returns the shared statement registry.
    #[must_use]
    pub const fn registry(&self) -> &'a StatementRegistry {
        self.registry
    }

    /// Returns the metrics sink.
    #[must_use]
    pub const fn metrics(&self) -> &'a dyn EntityMetrics {
        self.metrics
    }

    /// Returns the filter compiler limits.
    #[must_use]
    pub const fn compile_options(&self) -> CompileOptions {
        self.options
    }

    /// Returns a handle that aborts statements running on this connection.
    #[must_use]
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    /// Resolves `handle` to a prepared statement from the connection cache.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Store`] naming the statement when it is unknown
    /// to the registry or fails to prepare.
    pub fn statement(&self, handle: StatementHandle) -> Result<CachedStatement<'a>, EntityError> {
        let name = self.registry.name_of(handle).unwrap_or("<unknown>");
        let context = format!("Failed to get \"{name}\" prepared statement");
        let text = self
            .registry
            .text_of(handle)
            .ok_or_else(|| EntityError::store(&context, "statement is not registered"))?;
        trace!(statement = name, "resolving prepared statement");
        self.conn.prepare_cached(text).map_err(|err| EntityError::store(&context, err))
    }

    /// Returns the standard statement set registered for `E`.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvariantViolation`] when `E` was never
    /// registered or was registered with a different descriptor.
    pub fn statements_for<E: Entity>(&self) -> Result<&'a EntityStatements, EntityError> {
        let descriptor = E::descriptor();
        self.registry
            .entity(descriptor.name)
            .filter(|statements| statements.descriptor == descriptor)
            .ok_or_else(|| {
                EntityError::InvariantViolation(format!(
                    "entity {} has no registered statements",
                    descriptor.name
                ))
            })
    }
}
