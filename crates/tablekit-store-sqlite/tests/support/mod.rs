// crates/tablekit-store-sqlite/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Node fixture entity and store helpers for SQLite tests.
// ============================================================================
//! ## Overview
//! A `Node` entity with two filterable fields, plus helpers that open a
//! fresh store in a temporary directory.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only helpers; not every test binary uses every helper."
)]

use std::sync::Arc;

use tablekit_core::ColumnDescriptor;
use tablekit_core::ColumnType;
use tablekit_core::Criterion;
use tablekit_core::Dialect;
use tablekit_core::Entity;
use tablekit_core::EntityDescriptor;
use tablekit_core::EntityFilter;
use tablekit_core::RowError;
use tablekit_core::RowReader;
use tablekit_core::SqlValue;
use tablekit_core::StatementRegistry;
use tablekit_store_sqlite::Schema;
use tablekit_store_sqlite::SqliteEntityStore;
use tablekit_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

// ========================================================================
// Node Entity
// ========================================================================

/// Node table descriptor.
pub static NODE: EntityDescriptor = EntityDescriptor {
    name: "Node",
    table: "nodes",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("id", ColumnType::Integer),
        ColumnDescriptor::new("name", ColumnType::Text).not_null(),
        ColumnDescriptor::new("role", ColumnType::Text).not_null(),
        ColumnDescriptor::new("address", ColumnType::Text),
    ],
    natural_key: &["name"],
    filters: &[&["name"], &["role"], &["name", "role"]],
};

/// Schema holding the node table.
pub static NODE_SCHEMA: Schema = Schema {
    version: 1,
    entities: &[&NODE],
};

/// Cluster node row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Surrogate key.
    pub id: i64,
    /// Unique node name.
    pub name: String,
    /// Node role.
    pub role: String,
    /// Optional address.
    pub address: Option<String>,
}

impl Node {
    /// Builds an unsaved node.
    pub fn new(name: &str, role: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            role: role.to_string(),
            address: None,
        }
    }
}

/// Sparse node filter.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Name to match.
    pub name: Option<String>,
    /// Role to match.
    pub role: Option<String>,
    /// Address to match (no registered statement).
    pub address: Option<String>,
}

impl NodeFilter {
    /// Filter on name only.
    pub fn name(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Filter on role only.
    pub fn role(role: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            ..Self::default()
        }
    }
}

impl EntityFilter for NodeFilter {
    fn criteria(&self) -> Vec<Criterion> {
        let mut criteria = Vec::new();
        if let Some(name) = &self.name {
            criteria.push(Criterion::new("name", name));
        }
        if let Some(role) = &self.role {
            criteria.push(Criterion::new("role", role));
        }
        if let Some(address) = &self.address {
            criteria.push(Criterion::new("address", address));
        }
        criteria
    }
}

impl Entity for Node {
    type Key = str;
    type Filter = NodeFilter;

    fn descriptor() -> &'static EntityDescriptor {
        &NODE
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_values(key: &str) -> Vec<SqlValue> {
        vec![SqlValue::from(key)]
    }

    fn natural_key_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::from(&self.name)]
    }

    fn key_filter(key: &str) -> NodeFilter {
        NodeFilter::name(key)
    }

    fn mutable_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::from(&self.name),
            SqlValue::from(&self.role),
            SqlValue::from(self.address.clone()),
        ]
    }

    fn from_row(row: &mut RowReader) -> Result<Self, RowError> {
        Ok(Self {
            id: row.next_i64()?,
            name: row.next_text()?,
            role: row.next_text()?,
            address: row.next_optional_text()?,
        })
    }
}

// ========================================================================
// Store Helpers
// ========================================================================

/// Builds a registry holding the node statements.
pub fn node_registry(dialect: Dialect) -> Arc<StatementRegistry> {
    let mut registry = StatementRegistry::new(dialect);
    registry.register_entity(&NODE).expect("register node statements");
    Arc::new(registry)
}

/// Opens a store in `dir` with the node schema applied.
pub fn open_with(dir: &TempDir, config: impl FnOnce(&mut SqliteStoreConfig)) -> SqliteEntityStore {
    let mut store_config = SqliteStoreConfig::new(dir.path().join("store.db"));
    config(&mut store_config);
    let store = SqliteEntityStore::open(store_config, node_registry(Dialect::Positional)).expect("open store");
    store.apply_schema(&NODE_SCHEMA).expect("apply schema");
    store
}

/// Opens a default store in a fresh temporary directory.
pub fn open_store() -> (TempDir, SqliteEntityStore) {
    let dir = TempDir::new().expect("temp dir");
    let store = open_with(&dir, |_| {});
    (dir, store)
}
