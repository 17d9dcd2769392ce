// crates/tablekit-core/src/error.rs
// ============================================================================
// Module: Entity Errors
// Description: Typed outcomes of entity operations.
// Purpose: Separate not-found, conflict, invariant, input, store, and
//          cancellation failures so callers can branch on them.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`EntityError`] is the single error type returned by CRUD operations and
//! the filter compiler. Driver failures are wrapped as
//! [`EntityError::Store`] with context naming the failing step; typed
//! outcomes pass through [`EntityError::context`] unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by entity operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `NotFound` is downgraded only by existence checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// The targeted entity does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// Entity name.
        entity: &'static str,
    },
    /// An entity with the same natural key already exists.
    #[error("This \"{table}\" entry already exists")]
    Conflict {
        /// Table name.
        table: &'static str,
    },
    /// More or fewer rows matched or changed than exactly one.
    #[error("{0}")]
    InvariantViolation(String),
    /// The caller supplied unusable input.
    #[error("{0}")]
    InvalidInput(String),
    /// The store failed to prepare, execute, or decode a statement.
    #[error("{context}: {message}")]
    Store {
        /// Operation context.
        context: String,
        /// Underlying failure message.
        message: String,
    },
    /// The operation deadline passed or its cancellation token fired.
    #[error("operation cancelled: {0}")]
    Cancelled(String),
}

impl EntityError {
    /// Wraps a store failure with operation context.
    #[must_use]
    pub fn store(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Store {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Prepends context to store failures; typed outcomes pass through.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        match self {
            Self::Store {
                context: inner,
                message,
            } => Self::Store {
                context: context.into(),
                message: format!("{inner}: {message}"),
            },
            other => other,
        }
    }

    /// Returns true for [`EntityError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for [`EntityError::Conflict`].
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
