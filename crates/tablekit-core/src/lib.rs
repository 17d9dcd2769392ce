// crates/tablekit-core/src/lib.rs
// ============================================================================
// Module: Tablekit Core Library
// Description: Backend-agnostic entity mapping and filtered-query compiler.
// Purpose: Describe entities once and derive their statements, filter plans,
//          row decoding, and typed error outcomes from that description.
// Dependencies: serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! `tablekit-core` holds everything about entity persistence that does not
//! depend on a particular database driver:
//! - [`EntityDescriptor`] and the [`Entity`] / [`EntityFilter`] traits
//! - a small query-fragment model ([`SelectQuery`], [`Predicate`]) rendered per
//!   [`Dialect`]
//! - the [`StatementRegistry`] holding registered SQL text and the standard
//!   per-entity statement sets
//! - the filter compiler ([`compile_filters`]) choosing between the prepared
//!   fast path and a composed OR query
//! - the [`RowReader`] used by every row-decoding path
//! - the [`EntityError`] taxonomy, [`StatusCode`] mapping, and telemetry hooks
//! - [`check_path_limits`], the path rules shared by store and config files
//!
//! Backends (see `tablekit-store-sqlite`) resolve statement handles against a
//! live connection and execute the plans produced here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod context;
pub mod entity;
pub mod error;
pub mod filter;
pub mod path;
pub mod query;
pub mod registry;
pub mod row;
pub mod status;
pub mod telemetry;
pub mod value;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::CancellationToken;
pub use context::OperationContext;
pub use entity::ColumnDescriptor;
pub use entity::ColumnType;
pub use entity::Criterion;
pub use entity::DescriptorError;
pub use entity::Entity;
pub use entity::EntityDescriptor;
pub use entity::EntityFilter;
pub use error::EntityError;
pub use filter::CompileOptions;
pub use filter::DEFAULT_MAX_FILTERS;
pub use filter::MAX_FILTERS_LIMIT;
pub use filter::QueryPlan;
pub use filter::compile_filters;
pub use path::MAX_PATH_COMPONENT_LENGTH;
pub use path::MAX_TOTAL_PATH_LENGTH;
pub use path::PathLimitError;
pub use path::check_path_limits;
pub use query::Dialect;
pub use query::Predicate;
pub use query::SelectQuery;
pub use registry::EntityStatements;
pub use registry::FilterStatement;
pub use registry::RegistryError;
pub use registry::StatementHandle;
pub use registry::StatementRegistry;
pub use row::RowError;
pub use row::RowReader;
pub use status::StatusCode;
pub use status::status_matches;
pub use telemetry::EntityMetrics;
pub use telemetry::NoopMetrics;
pub use telemetry::OPERATION_LATENCY_BUCKETS_MS;
pub use telemetry::Operation;
pub use telemetry::OperationEvent;
pub use telemetry::Outcome;
pub use telemetry::TracingMetrics;
pub use value::SqlValue;
