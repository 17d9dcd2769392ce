// crates/tablekit-core/src/entity.rs
// ============================================================================
// Module: Entity Descriptors
// Description: Static table metadata and the traits entities implement.
// Purpose: Provide the single description every statement, filter plan, and
//          row mapper is derived from.
// Dependencies: thiserror, crate::{row, value}
// ============================================================================

//! ## Overview
//! An [`EntityDescriptor`] is immutable, `'static` metadata describing one
//! table: its surrogate key, ordered column list, natural key, and the filter
//! field combinations that get a dedicated prepared statement. Entity types
//! tie themselves to a descriptor by implementing [`Entity`]; their filter
//! structs implement [`EntityFilter`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::row::RowError;
use crate::row::RowReader;
use crate::value::SqlValue;

// ============================================================================
// SECTION: Columns
// ============================================================================

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Integer column.
    Integer,
    /// Floating point column.
    Real,
    /// Text column.
    Text,
    /// Binary column.
    Blob,
}

impl ColumnType {
    /// Returns the SQL type name used in table definitions.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

/// A single column in an entity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Unqualified column name.
    pub name: &'static str,
    /// Declared storage type.
    pub column_type: ColumnType,
    /// Whether the column carries a `NOT NULL` constraint.
    pub not_null: bool,
}

impl ColumnDescriptor {
    /// Creates a nullable column.
    #[must_use]
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            not_null: false,
        }
    }

    /// Marks the column `NOT NULL`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }
}

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// Errors raised while validating an entity descriptor.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The descriptor declares no columns.
    #[error("entity {entity} declares no columns")]
    NoColumns {
        /// Entity name.
        entity: &'static str,
    },
    /// The first column is not the surrogate key.
    #[error("entity {entity}: first column must be the id column {id_column}")]
    IdNotFirst {
        /// Entity name.
        entity: &'static str,
        /// Declared id column.
        id_column: &'static str,
    },
    /// A column name appears more than once.
    #[error("entity {entity}: duplicate column {column}")]
    DuplicateColumn {
        /// Entity name.
        entity: &'static str,
        /// Duplicated column.
        column: &'static str,
    },
    /// The natural key is empty or names the surrogate key.
    #[error("entity {entity}: natural key must name at least one non-id column")]
    InvalidNaturalKey {
        /// Entity name.
        entity: &'static str,
    },
    /// A referenced field is not a declared column.
    #[error("entity {entity}: unknown field {field}")]
    UnknownField {
        /// Entity name.
        entity: &'static str,
        /// Unknown field.
        field: &'static str,
    },
    /// No filter combination matches the natural key, so key lookups
    /// cannot be compiled.
    #[error("entity {entity}: natural key {natural_key} is not a filter combination")]
    NaturalKeyNotFilterable {
        /// Entity name.
        entity: &'static str,
        /// Rendered natural key.
        natural_key: String,
    },
    /// A filter combination is empty or repeats a field.
    #[error("entity {entity}: invalid filter combination {combination}")]
    InvalidFilter {
        /// Entity name.
        entity: &'static str,
        /// Rendered combination.
        combination: String,
    },
}

/// Static description of an entity table.
///
/// # Invariants
/// - `columns[0]` is the surrogate key named by `id_column`.
/// - `natural_key` and every entry of `filters` name declared non-id columns.
/// - `natural_key` is itself one of the `filters` combinations.
/// - Results are always ordered by the natural key columns, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Entity type name (for example `JujuUser`).
    pub name: &'static str,
    /// Table name (for example `jujuuser`).
    pub table: &'static str,
    /// Surrogate key column.
    pub id_column: &'static str,
    /// Ordered column list, surrogate key first.
    pub columns: &'static [ColumnDescriptor],
    /// Natural key columns.
    pub natural_key: &'static [&'static str],
    /// Filter field combinations with a dedicated statement.
    pub filters: &'static [&'static [&'static str]],
}

impl EntityDescriptor {
    /// Validates the descriptor's internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError`] describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        let Some(first) = self.columns.first() else {
            return Err(DescriptorError::NoColumns { entity: self.name });
        };
        if first.name != self.id_column {
            return Err(DescriptorError::IdNotFirst {
                entity: self.name,
                id_column: self.id_column,
            });
        }
        let mut seen = BTreeSet::new();
        for column in self.columns {
            if !seen.insert(column.name) {
                return Err(DescriptorError::DuplicateColumn {
                    entity: self.name,
                    column: column.name,
                });
            }
        }
        if self.natural_key.is_empty() || self.natural_key.contains(&self.id_column) {
            return Err(DescriptorError::InvalidNaturalKey { entity: self.name });
        }
        for field in self.natural_key {
            self.ensure_field(field)?;
        }
        for combination in self.filters {
            let unique: BTreeSet<&str> = combination.iter().copied().collect();
            if combination.is_empty() || unique.len() != combination.len() {
                return Err(DescriptorError::InvalidFilter {
                    entity: self.name,
                    combination: combination.join(", "),
                });
            }
            for field in *combination {
                self.ensure_field(field)?;
            }
        }
        if self.filter_combination(self.natural_key).is_none() {
            return Err(DescriptorError::NaturalKeyNotFilterable {
                entity: self.name,
                natural_key: self.natural_key.join(", "),
            });
        }
        Ok(())
    }

    /// Returns the column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> {
        self.columns.iter().map(|column| column.name)
    }

    /// Returns the columns written on insert and update (every non-id column).
    pub fn mutable_columns(&self) -> impl Iterator<Item = &'static ColumnDescriptor> {
        let id_column = self.id_column;
        self.columns.iter().filter(move |column| column.name != id_column)
    }

    /// Returns a column name qualified by the table (`table.column`).
    #[must_use]
    pub fn qualified(&self, column: &str) -> String {
        format!("{}.{column}", self.table)
    }

    /// Renders the qualified column list used by SELECT statements.
    #[must_use]
    pub fn columns_sql(&self) -> String {
        self.column_names().map(|name| self.qualified(name)).collect::<Vec<_>>().join(", ")
    }

    /// Returns the name of the entity's filter type (`<Entity>Filter`).
    #[must_use]
    pub fn filter_name(&self) -> String {
        format!("{}Filter", self.name)
    }

    /// Finds the registered filter combination matching `fields` as a set.
    #[must_use]
    pub fn filter_combination(&self, fields: &[&str]) -> Option<&'static [&'static str]> {
        let wanted: BTreeSet<&str> = fields.iter().copied().collect();
        if wanted.len() != fields.len() {
            return None;
        }
        self.filters.iter().copied().find(|combination| {
            combination.len() == wanted.len()
                && combination.iter().all(|field| wanted.contains(field))
        })
    }

    /// Ensures a field names a declared non-id column.
    fn ensure_field(&self, field: &'static str) -> Result<(), DescriptorError> {
        if field != self.id_column && self.column_names().any(|name| name == field) {
            Ok(())
        } else {
            Err(DescriptorError::UnknownField {
                entity: self.name,
                field,
            })
        }
    }
}

// ============================================================================
// SECTION: Entity Traits
// ============================================================================

/// One field value named by a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    /// Unqualified column name.
    pub field: &'static str,
    /// Value the column must equal.
    pub value: SqlValue,
}

impl Criterion {
    /// Creates a criterion for `field = value`.
    #[must_use]
    pub fn new(field: &'static str, value: impl Into<SqlValue>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Sparse filter over an entity's indexed fields.
pub trait EntityFilter {
    /// Returns the criteria for every field the filter sets.
    ///
    /// An empty result means the filter sets nothing, which callers treat as
    /// invalid input rather than "match everything".
    fn criteria(&self) -> Vec<Criterion>;
}

/// A value type persisted in one entity table.
pub trait Entity: Sized {
    /// Natural key used for lookups.
    type Key: ?Sized;
    /// Filter type accepted by multi-row lookups.
    type Filter: EntityFilter;

    /// Returns the entity's static descriptor.
    fn descriptor() -> &'static EntityDescriptor;

    /// Returns the surrogate key assigned at creation.
    fn id(&self) -> i64;

    /// Returns the natural key columns' values for `key`, in descriptor order.
    fn key_values(key: &Self::Key) -> Vec<SqlValue>;

    /// Returns this value's natural key columns' values, in descriptor order.
    fn natural_key_values(&self) -> Vec<SqlValue>;

    /// Returns an equality filter selecting `key`.
    fn key_filter(key: &Self::Key) -> Self::Filter;

    /// Returns the mutable column values in descriptor order.
    fn mutable_values(&self) -> Vec<SqlValue>;

    /// Decodes one row laid out in descriptor column order.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when a column is missing or has the wrong type.
    fn from_row(row: &mut RowReader) -> Result<Self, RowError>;
}
