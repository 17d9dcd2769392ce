// crates/tablekit-store-sqlite/src/lib.rs
// ============================================================================
// Module: Tablekit SQLite Store
// Description: Entity CRUD backend using SQLite.
// Purpose: Execute the statements and plans built by tablekit-core against a
//          SQLite connection with strict row-count semantics.
// Dependencies: rusqlite, serde, tablekit-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! This crate binds the backend-neutral pieces of `tablekit-core` to
//! `SQLite`:
//! - [`SqliteEntityStore`] owns the connection, applies pragmas and the
//!   versioned schema, and runs units of work inside a transaction
//! - [`EntityTx`] resolves statement handles through the connection's
//!   prepared-statement cache
//! - [`crud`] provides the generic `get_many` / `get_one` / `get_id` /
//!   `exists` / `create` / `delete` / `update` operations
//! - [`mapper`] decodes rows for both prepared and composed queries
//!
//! The CRUD layer never commits or rolls back; the store's
//! [`SqliteEntityStore::transaction`] owns that decision.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod context;
pub mod crud;
pub mod mapper;
pub mod schema;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::EntityTx;
pub use schema::Schema;
pub use schema::create_table_sql;
pub use store::MAX_STATEMENT_CACHE_CAPACITY;
pub use store::SqliteEntityStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteTransactionBehavior;
