// crates/tablekit-cluster/src/lib.rs
// ============================================================================
// Module: Tablekit Cluster Library
// Description: Cluster entities over the tablekit entity store.
// Purpose: Provide the Juju user table and a config-driven database handle.
// Dependencies: tablekit-config, tablekit-core, tablekit-store-sqlite
// ============================================================================

//! ## Overview
//! `tablekit-cluster` instantiates the generic entity operations for the
//! cluster's tables. Each entity contributes a descriptor, a value type, a
//! filter, and thin typed wrappers; [`ClusterDatabase`] opens a store with
//! every entity registered and its schema applied.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod database;
pub mod juju_user;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use database::ClusterDatabase;
pub use database::ClusterError;
pub use juju_user::JUJU_USER;
pub use juju_user::JujuUser;
pub use juju_user::JujuUserFilter;
pub use juju_user::create_juju_user;
pub use juju_user::delete_juju_user;
pub use juju_user::get_juju_user;
pub use juju_user::get_juju_user_id;
pub use juju_user::get_juju_users;
pub use juju_user::get_juju_users_raw;
pub use juju_user::juju_user_columns;
pub use juju_user::juju_user_exists;
pub use juju_user::update_juju_user;
pub use schema::CLUSTER_SCHEMA;
pub use schema::statement_registry;
