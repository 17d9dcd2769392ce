// crates/tablekit-cluster/src/database.rs
// ============================================================================
// Module: Cluster Database
// Description: Config-driven construction of the cluster entity store.
// Purpose: Wire configuration, statement registry, schema, and telemetry.
// Dependencies: tablekit-config, tablekit-core, tablekit-store-sqlite, tracing
// ============================================================================

//! ## Overview
//! [`ClusterDatabase`] owns a [`SqliteEntityStore`] opened from a
//! [`TablekitConfig`], with the cluster statements registered, the schema
//! applied, and operation events routed to `tracing`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use tablekit_config::ConfigError;
use tablekit_config::TablekitConfig;
use tablekit_core::EntityError;
use tablekit_core::RegistryError;
use tablekit_core::TracingMetrics;
use tablekit_store_sqlite::EntityTx;
use tablekit_store_sqlite::SqliteEntityStore;
use tablekit_store_sqlite::SqliteStoreError;
use thiserror::Error;
use tracing::info;

use crate::schema::CLUSTER_SCHEMA;
use crate::schema::statement_registry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while opening the cluster database.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Statement registration failed.
    #[error("statement registry error: {0}")]
    Registry(#[from] RegistryError),
    /// The store failed to open or apply its schema.
    #[error(transparent)]
    Store(#[from] SqliteStoreError),
}

// ============================================================================
// SECTION: Database
// ============================================================================

/// Cluster entity store.
pub struct ClusterDatabase {
    /// Underlying store.
    store: SqliteEntityStore,
}

impl ClusterDatabase {
    /// Loads configuration from `path` (see [`TablekitConfig::load`]) and
    /// opens the database it describes.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] when loading, opening, or schema bootstrap
    /// fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ClusterError> {
        let config = TablekitConfig::load(path)?;
        Self::open(&config)
    }

    /// Opens the database described by `config` and applies the schema.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError`] when `config` is invalid, the store cannot be
    /// opened, or the stored schema version is unsupported.
    pub fn open(config: &TablekitConfig) -> Result<Self, ClusterError> {
        config.validate()?;
        let registry = Arc::new(statement_registry(config.query.dialect)?);
        let store = SqliteEntityStore::open(config.store.clone(), registry)?
            .with_compile_options(config.compile_options())
            .with_metrics(Arc::new(TracingMetrics));
        store.apply_schema(&CLUSTER_SCHEMA)?;
        info!(
            path = %config.store.path.display(),
            schema_version = CLUSTER_SCHEMA.version,
            dialect = config.query.dialect.as_str(),
            "cluster database ready"
        );
        Ok(Self {
            store,
        })
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &SqliteEntityStore {
        &self.store
    }

    /// Runs `work` in one transaction; see [`SqliteEntityStore::transaction`].
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work` or by begin/commit.
    pub fn transaction<T, F>(&self, work: F) -> Result<T, EntityError>
    where
        F: FnOnce(&EntityTx<'_>) -> Result<T, EntityError>,
    {
        self.store.transaction(work)
    }
}
