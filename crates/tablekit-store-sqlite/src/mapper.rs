// crates/tablekit-store-sqlite/src/mapper.rs
// ============================================================================
// Module: SQLite Row Mapper
// Description: Argument binding and row decoding for entity queries.
// Purpose: Decode rows from prepared, composed, and hand-written queries
//          through one path.
// Dependencies: rusqlite, tablekit-core
// ============================================================================

//! ## Overview
//! Every SELECT that yields entities ends in [`collect_rows`]: each column is
//! read into a [`SqlValue`] in descriptor order and handed to
//! [`Entity::from_row`]. The operation context is checked before execution
//! and between rows. Driver failures are wrapped as
//! `Failed to fetch from "<table>" table`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::ErrorCode;
use rusqlite::Statement;
use rusqlite::ToSql;
use rusqlite::params_from_iter;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::Value;
use rusqlite::types::ValueRef;
use tablekit_core::Entity;
use tablekit_core::EntityDescriptor;
use tablekit_core::EntityError;
use tablekit_core::OperationContext;
use tablekit_core::QueryPlan;
use tablekit_core::RowReader;
use tablekit_core::SqlValue;

use crate::context::EntityTx;

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// Borrowed [`SqlValue`] bound as a statement argument.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Param<'a>(pub(crate) &'a SqlValue);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            SqlValue::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            SqlValue::Integer(value) => ToSqlOutput::Borrowed(ValueRef::Integer(*value)),
            SqlValue::Real(value) => ToSqlOutput::Borrowed(ValueRef::Real(*value)),
            SqlValue::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            SqlValue::Blob(value) => ToSqlOutput::Borrowed(ValueRef::Blob(value)),
        })
    }
}

/// Binds `args` positionally.
pub(crate) fn bind(args: &[SqlValue]) -> impl rusqlite::Params + '_ {
    params_from_iter(args.iter().map(Param))
}

/// Converts a driver value into a [`SqlValue`].
fn from_driver(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(value) => SqlValue::Integer(value),
        Value::Real(value) => SqlValue::Real(value),
        Value::Text(value) => SqlValue::Text(value),
        Value::Blob(value) => SqlValue::Blob(value),
    }
}

// ============================================================================
// SECTION: Error Mapping
// ============================================================================

/// Maps a driver error for `descriptor`'s table.
///
/// Interrupts become [`EntityError::Cancelled`] and UNIQUE violations become
/// [`EntityError::Conflict`]; everything else is a store failure under
/// `context`.
pub(crate) fn map_driver_error(
    descriptor: &'static EntityDescriptor,
    context: &str,
    err: &rusqlite::Error,
) -> EntityError {
    if let rusqlite::Error::SqliteFailure(failure, _) = err {
        if failure.code == ErrorCode::OperationInterrupted {
            return EntityError::Cancelled("statement interrupted".to_string());
        }
        if failure.code == ErrorCode::ConstraintViolation
            && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        {
            return EntityError::Conflict {
                table: descriptor.table,
            };
        }
    }
    EntityError::store(context, err)
}

/// Returns the fetch-failure context for `descriptor`.
pub(crate) fn fetch_context(descriptor: &EntityDescriptor) -> String {
    format!("Failed to fetch from \"{}\" table", descriptor.table)
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Returns the qualified column list for hand-written entity queries.
#[must_use]
pub fn columns(descriptor: &EntityDescriptor) -> String {
    descriptor.columns_sql()
}

/// Executes `statement` and decodes every row as `E`.
pub(crate) fn collect_rows<E: Entity>(
    statement: &mut Statement<'_>,
    ctx: &OperationContext,
    args: &[SqlValue],
) -> Result<Vec<E>, EntityError> {
    let descriptor = E::descriptor();
    let context = fetch_context(descriptor);
    ctx.check()?;
    let width = statement.column_count();
    let mut rows = statement.query(bind(args)).map_err(|err| map_driver_error(descriptor, &context, &err))?;
    let mut decoded = Vec::new();
    while let Some(row) = rows.next().map_err(|err| map_driver_error(descriptor, &context, &err))? {
        ctx.check()?;
        let mut values = Vec::with_capacity(width);
        for index in 0 .. width {
            let value: Value =
                row.get(index).map_err(|err| map_driver_error(descriptor, &context, &err))?;
            values.push(from_driver(value));
        }
        let mut reader = RowReader::new(descriptor, values);
        let entity = E::from_row(&mut reader).map_err(|err| EntityError::store(&context, err))?;
        reader.finish().map_err(|err| EntityError::store(&context, err))?;
        decoded.push(entity);
    }
    Ok(decoded)
}

/// Executes a compiled filter plan.
///
/// # Errors
///
/// Returns [`EntityError`] when the statement fails to prepare, execute, or
/// decode, or when `ctx` is cancelled.
pub fn select_plan<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    plan: &QueryPlan,
) -> Result<Vec<E>, EntityError> {
    match plan {
        QueryPlan::Prepared { handle, args } => {
            let mut statement = tx.statement(*handle)?;
            collect_rows(&mut statement, ctx, args)
        }
        QueryPlan::Composed { sql, args } => select_with(tx, ctx, sql, args),
    }
}

/// Runs a hand-written SELECT through the entity row mapper.
///
/// The query must return the entity's columns in descriptor order; see
/// [`columns`].
///
/// # Errors
///
/// Returns [`EntityError`] when the query fails to prepare, execute, or
/// decode, or when `ctx` is cancelled.
pub fn select_with<E: Entity>(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    sql: &str,
    args: &[SqlValue],
) -> Result<Vec<E>, EntityError> {
    let descriptor = E::descriptor();
    let mut statement = tx
        .connection()
        .prepare(sql)
        .map_err(|err| map_driver_error(descriptor, &fetch_context(descriptor), &err))?;
    collect_rows(&mut statement, ctx, args)
}
