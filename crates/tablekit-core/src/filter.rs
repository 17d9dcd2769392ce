// crates/tablekit-core/src/filter.rs
// ============================================================================
// Module: Filter Compiler
// Description: Turns entity filters into an executable query plan.
// Purpose: Reuse the registered statement for zero or one filter and compose
//          a single OR query from registered fragments for several.
// Dependencies: tracing, crate::{entity, error, query, registry, value}
// ============================================================================

//! ## Overview
//! [`compile_filters`] picks one of three strategies:
//! - no filters: the entity's "objects" statement
//! - one filter: the prepared "objects by <fields>" statement for the
//!   filter's field combination
//! - several filters: one SELECT whose WHERE clause is the OR of each
//!   filter's registered predicate, arguments concatenated in filter order
//!
//! Every filter must set at least one field, no field may be NULL (equality
//! never matches NULL), and its field set must match a registered
//! combination. The compiler never inspects SQL text, and filter
//! values only ever bind as arguments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use tracing::debug;

use crate::entity::EntityFilter;
use crate::error::EntityError;
use crate::query::Predicate;
use crate::registry::EntityStatements;
use crate::registry::FilterStatement;
use crate::registry::StatementHandle;
use crate::registry::StatementRegistry;
use crate::value::SqlValue;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default cap on filters per query.
pub const DEFAULT_MAX_FILTERS: usize = 256;
/// Hard upper bound accepted for the filter cap.
pub const MAX_FILTERS_LIMIT: usize = 4096;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Compiler limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Maximum number of filters accepted in one call.
    pub max_filters: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_filters: DEFAULT_MAX_FILTERS,
        }
    }
}

// ============================================================================
// SECTION: Plans
// ============================================================================

/// Executable outcome of filter compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    /// Execute a registered statement.
    Prepared {
        /// Registered statement.
        handle: StatementHandle,
        /// Arguments in placeholder order.
        args: Vec<SqlValue>,
    },
    /// Execute composed SQL text.
    Composed {
        /// Rendered SQL.
        sql: String,
        /// Arguments in placeholder order.
        args: Vec<SqlValue>,
    },
}

impl QueryPlan {
    /// Returns the plan's arguments.
    #[must_use]
    pub fn args(&self) -> &[SqlValue] {
        match self {
            Self::Prepared { args, .. } | Self::Composed { args, .. } => args,
        }
    }

    /// Returns a stable label for the chosen strategy.
    #[must_use]
    pub const fn strategy(&self) -> &'static str {
        match self {
            Self::Prepared { .. } => "prepared",
            Self::Composed { .. } => "composed",
        }
    }
}

// ============================================================================
// SECTION: Compiler
// ============================================================================

/// Compiles `filters` into a query plan for one entity.
///
/// # Errors
///
/// Returns [`EntityError::InvalidInput`] when there are too many filters, a
/// filter is empty, repeats a field, or sets a field to NULL, or no statement
/// exists for a filter's field combination.
pub fn compile_filters<F: EntityFilter>(
    registry: &StatementRegistry,
    statements: &EntityStatements,
    filters: &[F],
    options: CompileOptions,
) -> Result<QueryPlan, EntityError> {
    let descriptor = statements.descriptor;
    if filters.len() > options.max_filters {
        return Err(EntityError::InvalidInput(format!(
            "too many filters for {}: {} exceeds limit {}",
            descriptor.filter_name(),
            filters.len(),
            options.max_filters
        )));
    }

    let mut resolved = Vec::with_capacity(filters.len());
    for filter in filters {
        resolved.push(resolve_filter(statements, filter)?);
    }

    let plan = match resolved.len() {
        0 => QueryPlan::Prepared {
            handle: statements.objects,
            args: Vec::new(),
        },
        1 => {
            let (statement, args) = resolved.remove(0);
            QueryPlan::Prepared {
                handle: statement.handle,
                args,
            }
        }
        _ => compose(registry, statements, resolved)?,
    };
    debug!(
        entity = descriptor.name,
        filters = filters.len(),
        strategy = plan.strategy(),
        "compiled entity filters"
    );
    Ok(plan)
}

/// Matches one filter to its registered statement and orders its arguments.
fn resolve_filter<F: EntityFilter>(
    statements: &EntityStatements,
    filter: &F,
) -> Result<(FilterStatement, Vec<SqlValue>), EntityError> {
    let descriptor = statements.descriptor;
    let criteria = filter.criteria();
    if criteria.is_empty() {
        return Err(EntityError::InvalidInput(format!(
            "cannot filter on empty {}",
            descriptor.filter_name()
        )));
    }
    if let Some(criterion) = criteria.iter().find(|criterion| criterion.value.is_null()) {
        return Err(EntityError::InvalidInput(format!(
            "{} cannot match {} against NULL",
            descriptor.filter_name(),
            criterion.field
        )));
    }
    let fields: Vec<&str> = criteria.iter().map(|criterion| criterion.field).collect();
    let unique: BTreeSet<&str> = fields.iter().copied().collect();
    if unique.len() != fields.len() {
        return Err(EntityError::InvalidInput(format!(
            "{} sets a field more than once",
            descriptor.filter_name()
        )));
    }
    let statement = statements.by_fields(&fields).copied().ok_or_else(|| {
        EntityError::InvalidInput("no statement exists for the given filter".to_string())
    })?;
    let mut args = Vec::with_capacity(statement.fields.len());
    for field in statement.fields {
        let value = criteria
            .iter()
            .find(|criterion| criterion.field == *field)
            .map(|criterion| criterion.value.clone())
            .ok_or_else(|| {
                EntityError::InvalidInput("no statement exists for the given filter".to_string())
            })?;
        args.push(value);
    }
    Ok((statement, args))
}

/// ORs the registered predicates of several resolved filters together.
fn compose(
    registry: &StatementRegistry,
    statements: &EntityStatements,
    resolved: Vec<(FilterStatement, Vec<SqlValue>)>,
) -> Result<QueryPlan, EntityError> {
    let base = registry.query_of(statements.objects).ok_or_else(|| missing_query(registry, statements.objects))?;
    let mut predicates = Vec::with_capacity(resolved.len());
    let mut args = Vec::new();
    for (statement, filter_args) in resolved {
        let predicate = registry
            .query_of(statement.handle)
            .and_then(|query| query.predicate.clone())
            .ok_or_else(|| missing_query(registry, statement.handle))?;
        predicates.push(predicate);
        args.extend(filter_args);
    }
    let query = base.clone().with_predicate(Predicate::Any(predicates));
    Ok(QueryPlan::Composed {
        sql: query.render(registry.dialect()),
        args,
    })
}

/// Reports a registered SELECT that lost its structured form.
fn missing_query(registry: &StatementRegistry, handle: StatementHandle) -> EntityError {
    EntityError::InvariantViolation(format!(
        "statement {} has no structured query",
        registry.name_of(handle).unwrap_or("<unknown>")
    ))
}
