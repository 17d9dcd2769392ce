// crates/tablekit-cluster/src/schema.rs
// ============================================================================
// Module: Cluster Schema
// Description: Versioned table set and statement registry for cluster data.
// Purpose: Register every cluster entity once, in a fixed order.
// Dependencies: tablekit-core, tablekit-store-sqlite
// ============================================================================

//! ## Overview
//! [`CLUSTER_SCHEMA`] lists the tables owned by the cluster database and
//! [`statement_registry`] builds the matching statement set. Both must list
//! the same entities.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tablekit_core::Dialect;
use tablekit_core::RegistryError;
use tablekit_core::StatementRegistry;
use tablekit_store_sqlite::Schema;

use crate::juju_user::JUJU_USER;

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Current cluster schema.
pub static CLUSTER_SCHEMA: Schema = Schema {
    version: 1,
    entities: &[&JUJU_USER],
};

/// Builds the registry holding every cluster entity's statements.
///
/// # Errors
///
/// Returns [`RegistryError`] when a descriptor is invalid or two entities
/// derive the same statement name.
pub fn statement_registry(dialect: Dialect) -> Result<StatementRegistry, RegistryError> {
    let mut registry = StatementRegistry::new(dialect);
    for descriptor in CLUSTER_SCHEMA.entities {
        registry.register_entity(descriptor)?;
    }
    Ok(registry)
}
