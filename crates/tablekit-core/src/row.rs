// crates/tablekit-core/src/row.rs
// ============================================================================
// Module: Row Reader
// Description: Positional cursor over one decoded result row.
// Purpose: Give entity decoders a single typed path regardless of how the
//          row was produced.
// Dependencies: thiserror, crate::{entity, value}
// ============================================================================

//! ## Overview
//! Backends read every column of a row into [`SqlValue`]s in descriptor order
//! and hand them to [`RowReader`]. Entities consume the reader front to back.
//! Prepared and composed queries both decode through this type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;

use thiserror::Error;

use crate::entity::EntityDescriptor;
use crate::value::SqlValue;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Row decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The row ended before the requested column.
    #[error("row has no column at position {position}")]
    Missing {
        /// Zero-based column position.
        position: usize,
    },
    /// A column held a value of an unexpected storage class.
    #[error("column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// Expected storage class.
        expected: &'static str,
        /// Storage class actually present.
        found: &'static str,
    },
    /// The row has columns the decoder did not consume.
    #[error("row has {remaining} undecoded trailing columns")]
    Trailing {
        /// Number of unread columns.
        remaining: usize,
    },
}

// ============================================================================
// SECTION: Reader
// ============================================================================

/// Cursor over one row's values in descriptor column order.
#[derive(Debug)]
pub struct RowReader {
    /// Descriptor naming the columns.
    descriptor: &'static EntityDescriptor,
    /// Values not yet consumed.
    values: VecDeque<SqlValue>,
    /// Position of the next value.
    position: usize,
}

impl RowReader {
    /// Creates a reader over `values`.
    #[must_use]
    pub fn new(descriptor: &'static EntityDescriptor, values: Vec<SqlValue>) -> Self {
        Self {
            descriptor,
            values: values.into(),
            position: 0,
        }
    }

    /// Returns the number of unread values.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// Takes the next raw value.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::Missing`] when the row is exhausted.
    pub fn next_value(&mut self) -> Result<SqlValue, RowError> {
        let value = self.values.pop_front().ok_or(RowError::Missing {
            position: self.position,
        })?;
        self.position += 1;
        Ok(value)
    }

    /// Reads a non-null integer.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when the column is missing or not an integer.
    pub fn next_i64(&mut self) -> Result<i64, RowError> {
        match self.next_value()? {
            SqlValue::Integer(value) => Ok(value),
            other => Err(self.mismatch("integer", &other)),
        }
    }

    /// Reads a nullable integer.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when the column is missing or not an integer.
    pub fn next_optional_i64(&mut self) -> Result<Option<i64>, RowError> {
        match self.next_value()? {
            SqlValue::Null => Ok(None),
            SqlValue::Integer(value) => Ok(Some(value)),
            other => Err(self.mismatch("integer", &other)),
        }
    }

    /// Reads a non-null float. Integers widen.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when the column is missing or not numeric.
    #[allow(clippy::cast_precision_loss, reason = "SQLite REAL affinity widens integers the same way")]
    pub fn next_f64(&mut self) -> Result<f64, RowError> {
        match self.next_value()? {
            SqlValue::Real(value) => Ok(value),
            SqlValue::Integer(value) => Ok(value as f64),
            other => Err(self.mismatch("real", &other)),
        }
    }

    /// Reads a boolean stored as integer `0`/`1`.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when the column is missing or not an integer.
    pub fn next_bool(&mut self) -> Result<bool, RowError> {
        self.next_i64().map(|value| value != 0)
    }

    /// Reads non-null text.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when the column is missing or not text.
    pub fn next_text(&mut self) -> Result<String, RowError> {
        match self.next_value()? {
            SqlValue::Text(value) => Ok(value),
            other => Err(self.mismatch("text", &other)),
        }
    }

    /// Reads nullable text.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when the column is missing or not text.
    pub fn next_optional_text(&mut self) -> Result<Option<String>, RowError> {
        match self.next_value()? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(value) => Ok(Some(value)),
            other => Err(self.mismatch("text", &other)),
        }
    }

    /// Reads a non-null blob.
    ///
    /// # Errors
    ///
    /// Returns [`RowError`] when the column is missing or not a blob.
    pub fn next_blob(&mut self) -> Result<Vec<u8>, RowError> {
        match self.next_value()? {
            SqlValue::Blob(value) => Ok(value),
            other => Err(self.mismatch("blob", &other)),
        }
    }

    /// Ensures every value was consumed.
    ///
    /// # Errors
    ///
    /// Returns [`RowError::Trailing`] when values remain.
    pub fn finish(self) -> Result<(), RowError> {
        if self.values.is_empty() {
            Ok(())
        } else {
            Err(RowError::Trailing {
                remaining: self.values.len(),
            })
        }
    }

    /// Builds a mismatch error for the value just consumed.
    fn mismatch(&self, expected: &'static str, found: &SqlValue) -> RowError {
        let index = self.position.saturating_sub(1);
        let column = self
            .descriptor
            .columns
            .get(index)
            .map_or_else(|| format!("#{index}"), |column| column.name.to_string());
        RowError::TypeMismatch {
            column,
            expected,
            found: found.type_label(),
        }
    }
}
