// crates/tablekit-config/src/lib.rs
// ============================================================================
// Module: Tablekit Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for tablekit.toml semantics.
// Dependencies: serde, tablekit-core, tablekit-store-sqlite, toml
// ============================================================================

//! ## Overview
//! `tablekit-config` defines the configuration model for tablekit stores and
//! the filter compiler. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::MAX_CONFIG_FILE_SIZE;
pub use config::QueryConfig;
pub use config::TablekitConfig;
