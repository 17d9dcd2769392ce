// crates/tablekit-store-sqlite/src/crud.rs
// ============================================================================
// Module: Entity CRUD Operations
// Description: Generic read, write, and delete operations over any entity.
// Purpose: Enforce exactly-one-row and not-found versus conflict semantics
//          uniformly for every registered entity.
// Dependencies: rusqlite, tablekit-core, tracing
// ============================================================================

//! ## Overview
//! Each operation runs against a caller-supplied [`EntityTx`] and an
//! [`OperationContext`]. Operations never commit or roll back and keep no
//! state between calls. Outcomes:
//! - lookups of an absent natural key fail with [`EntityError::NotFound`]
//! - [`exists`] is the only operation that turns not-found into `false`
//! - [`create`] fails with [`EntityError::Conflict`] when the key is taken,
//!   both on the pre-check and on a UNIQUE violation at insert time
//! - any row count other than one where exactly one is expected fails with
//!   [`EntityError::InvariantViolation`]
//!
//! Every call records one [`OperationEvent`] and its latency.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use tablekit_core::Entity;
use tablekit_core::EntityError;
use tablekit_core::EntityStatements;
use tablekit_core::OperationContext;
use tablekit_core::Operation;
use tablekit_core::OperationEvent;
use tablekit_core::Outcome;
use tablekit_core::SqlValue;
use tablekit_core::compile_filters;
use tracing::warn;

use crate::context::EntityTx;
use crate::mapper::bind;
use crate::mapper::map_driver_error;
use crate::mapper::select_plan;

// ============================================================================
// SECTION: Read Operations
// ============================================================================

/// Returns every entity matching any of `filters`, ordered by natural key.
///
/// No filters selects every row. No matches yields an empty vector.
///
/// # Errors
///
/// Returns [`EntityError::InvalidInput`] for empty or unsupported filters,
/// [`EntityError::Cancelled`] when `ctx` fires, and [`EntityError::Store`]
/// for driver failures.
pub fn get_many<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    filters: &[E::Filter],
) -> Result<Vec<E>, EntityError> {
    observe::<E, _>(tx, Operation::GetMany, || select_filtered(tx, ctx, filters))
}

/// Returns the entity with natural key `key`.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] when no row matches and
/// [`EntityError::InvariantViolation`] when more than one does.
pub fn get_one<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    key: &E::Key,
) -> Result<E, EntityError> {
    observe::<E, _>(tx, Operation::GetOne, || {
        let descriptor = E::descriptor();
        let mut rows = select_filtered::<E>(tx, ctx, &[E::key_filter(key)])?;
        match rows.len() {
            0 => Err(EntityError::NotFound {
                entity: descriptor.name,
            }),
            1 => rows.pop().ok_or(EntityError::NotFound {
                entity: descriptor.name,
            }),
            _ => Err(EntityError::InvariantViolation(format!(
                "More than one \"{}\" entry matches",
                descriptor.table
            ))),
        }
    })
}

/// Returns the surrogate key of the entity with natural key `key`.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] when the key is absent.
pub fn get_id<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    key: &E::Key,
) -> Result<i64, EntityError> {
    observe::<E, _>(tx, Operation::GetId, || {
        let statements = tx.statements_for::<E>()?;
        lookup_id::<E>(tx, ctx, statements, &E::key_values(key))
    })
}

/// Returns whether an entity with natural key `key` exists.
///
/// # Errors
///
/// Propagates every lookup failure except not-found.
pub fn exists<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    key: &E::Key,
) -> Result<bool, EntityError> {
    observe::<E, _>(tx, Operation::Exists, || {
        let statements = tx.statements_for::<E>()?;
        key_exists::<E>(tx, ctx, statements, &E::key_values(key))
    })
}

// ============================================================================
// SECTION: Write Operations
// ============================================================================

/// Inserts `value` and returns its new surrogate key.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] when the natural key already exists and
/// [`EntityError::Store`] (context `Failed to check for duplicates`) when the
/// existence check itself fails.
pub fn create<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    value: &E,
) -> Result<i64, EntityError> {
    observe::<E, _>(tx, Operation::Create, || {
        let descriptor = E::descriptor();
        let statements = tx.statements_for::<E>()?;
        let taken = key_exists::<E>(tx, ctx, statements, &value.natural_key_values())
            .map_err(|err| err.context("Failed to check for duplicates"))?;
        if taken {
            return Err(EntityError::Conflict {
                table: descriptor.table,
            });
        }
        let mut statement = tx.statement(statements.create)?;
        ctx.check()?;
        let context = format!("Failed to create \"{}\" entry", descriptor.table);
        statement
            .execute(bind(&value.mutable_values()))
            .map_err(|err| map_driver_error(descriptor, &context, &err))?;
        Ok(tx.connection().last_insert_rowid())
    })
}

/// Deletes the entity with natural key `key`.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] when no row was deleted and
/// [`EntityError::InvariantViolation`] when more than one was.
pub fn delete<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    key: &E::Key,
) -> Result<(), EntityError> {
    observe::<E, _>(tx, Operation::Delete, || {
        let descriptor = E::descriptor();
        let statements = tx.statements_for::<E>()?;
        let mut statement = tx.statement(statements.delete_by_key)?;
        ctx.check()?;
        let context = format!("Delete \"{}\"", descriptor.table);
        let deleted = statement
            .execute(bind(&E::key_values(key)))
            .map_err(|err| map_driver_error(descriptor, &context, &err))?;
        match deleted {
            0 => Err(EntityError::NotFound {
                entity: descriptor.name,
            }),
            1 => Ok(()),
            count => Err(EntityError::InvariantViolation(format!(
                "Query deleted {count} {} rows instead of 1",
                descriptor.name
            ))),
        }
    })
}

/// Overwrites every mutable column of the entity with natural key `key`.
///
/// The surrogate key is resolved first; an absent key fails before any
/// UPDATE is issued.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] when the key is absent,
/// [`EntityError::Conflict`] when the new natural key is taken, and
/// [`EntityError::InvariantViolation`] when the update changes a row count
/// other than one.
pub fn update<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    key: &E::Key,
    value: &E,
) -> Result<(), EntityError> {
    observe::<E, _>(tx, Operation::Update, || {
        let descriptor = E::descriptor();
        let statements = tx.statements_for::<E>()?;
        let id = lookup_id::<E>(tx, ctx, statements, &E::key_values(key))?;
        let mut statement = tx.statement(statements.update)?;
        ctx.check()?;
        let mut args = value.mutable_values();
        args.push(SqlValue::Integer(id));
        let context = format!("Update \"{}\" entry failed", descriptor.table);
        let updated = statement
            .execute(bind(&args))
            .map_err(|err| map_driver_error(descriptor, &context, &err))?;
        if updated == 1 {
            Ok(())
        } else {
            Err(EntityError::InvariantViolation(format!("Query updated {updated} rows instead of 1")))
        }
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compiles `filters` and runs the resulting plan.
fn select_filtered<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    filters: &[E::Filter],
) -> Result<Vec<E>, EntityError> {
    let statements = tx.statements_for::<E>()?;
    let plan = compile_filters(tx.registry(), statements, filters, tx.compile_options())?;
    select_plan(tx, ctx, &plan)
}

/// Resolves the surrogate key for natural key values.
fn lookup_id<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    statements: &EntityStatements,
    key_values: &[SqlValue],
) -> Result<i64, EntityError> {
    let descriptor = E::descriptor();
    let context = format!("Failed to get \"{}\" ID", descriptor.table);
    let mut statement = tx.statement(statements.id)?;
    ctx.check()?;
    let mut rows = statement
        .query(bind(key_values))
        .map_err(|err| map_driver_error(descriptor, &context, &err))?;
    let Some(row) = rows.next().map_err(|err| map_driver_error(descriptor, &context, &err))? else {
        return Err(EntityError::NotFound {
            entity: descriptor.name,
        });
    };
    let id: i64 = row.get(0).map_err(|err| map_driver_error(descriptor, &context, &err))?;
    if rows.next().map_err(|err| map_driver_error(descriptor, &context, &err))?.is_some() {
        return Err(EntityError::InvariantViolation(format!(
            "More than one \"{}\" entry matches",
            descriptor.table
        )));
    }
    Ok(id)
}

/// Downgrades not-found from [`lookup_id`] to `false`.
fn key_exists<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    statements: &EntityStatements,
    key_values: &[SqlValue],
) -> Result<bool, EntityError> {
    match lookup_id::<E>(tx, ctx, statements, key_values) {
        Ok(_) => Ok(true),
        Err(EntityError::NotFound { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Runs one operation and records its outcome and latency.
fn observe<E: Entity, T>(
    tx: &EntityTx<'_>,
    operation: Operation,
    run: impl FnOnce() -> Result<T, EntityError>,
) -> Result<T, EntityError> {
    let descriptor = E::descriptor();
    let started = Instant::now();
    let result = run();
    let event = OperationEvent {
        entity: descriptor.name,
        table: descriptor.table,
        operation,
        outcome: Outcome::of(&result),
    };
    if let Err(EntityError::InvariantViolation(message)) = &result {
        warn!(
            entity = descriptor.name,
            operation = operation.as_str(),
            message = message.as_str(),
            "entity invariant violated"
        );
    }
    tx.metrics().record_operation(event);
    tx.metrics().record_latency(event, started.elapsed());
    result
}
