// crates/tablekit-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Schema
// Description: Table definitions derived from entity descriptors.
// Purpose: Create entity tables under a recorded schema version and refuse
//          databases written by a newer schema.
// Dependencies: rusqlite, tablekit-core
// ============================================================================

//! ## Overview
//! A [`Schema`] is a version number plus the entity descriptors whose tables
//! it owns. Bootstrap records the version in `schema_meta`. Older versions
//! are upgraded additively (missing tables are created); newer versions fail
//! closed with [`SqliteStoreError::VersionMismatch`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tablekit_core::EntityDescriptor;
use tracing::debug;

use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Versioned set of entity tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Schema version recorded in `schema_meta`.
    pub version: i64,
    /// Entities whose tables the schema owns.
    pub entities: &'static [&'static EntityDescriptor],
}

/// Renders the `CREATE TABLE` statement for an entity.
///
/// The surrogate key becomes `INTEGER PRIMARY KEY`. A single-column natural
/// key is declared `UNIQUE` inline; composite keys get a table constraint.
#[must_use]
pub fn create_table_sql(descriptor: &EntityDescriptor) -> String {
    let single_key = match descriptor.natural_key {
        [only] => Some(*only),
        _ => None,
    };
    let mut definitions: Vec<String> = descriptor
        .columns
        .iter()
        .map(|column| {
            let mut definition = format!("{} {}", column.name, column.column_type.sql_type());
            if column.name == descriptor.id_column {
                definition.push_str(" PRIMARY KEY");
                return definition;
            }
            if column.not_null {
                definition.push_str(" NOT NULL");
            }
            if single_key == Some(column.name) {
                definition.push_str(" UNIQUE");
            }
            definition
        })
        .collect();
    if single_key.is_none() {
        definitions.push(format!("UNIQUE ({})", descriptor.natural_key.join(", ")));
    }
    format!("CREATE TABLE IF NOT EXISTS {} ({})", descriptor.table, definitions.join(", "))
}

/// Initializes the schema or validates the existing version.
pub(crate) fn initialize_schema(
    connection: &mut Connection,
    schema: &Schema,
) -> Result<(), SqliteStoreError> {
    if schema.version <= 0 {
        return Err(SqliteStoreError::Invalid("schema version must be positive".to_string()));
    }
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS schema_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM schema_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        Some(value) if value == schema.version => {}
        Some(value) if value > schema.version => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
        stored => {
            for descriptor in schema.entities {
                descriptor.validate().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
                tx.execute_batch(&create_table_sql(descriptor))
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            }
            if stored.is_some() {
                tx.execute("UPDATE schema_meta SET version = ?1", params![schema.version])
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            } else {
                tx.execute("INSERT INTO schema_meta (version) VALUES (?1)", params![schema.version])
                    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            }
            debug!(
                from = stored.unwrap_or(0),
                to = schema.version,
                tables = schema.entities.len(),
                "applied schema"
            );
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
