// crates/tablekit-core/src/status.rs
// ============================================================================
// Module: Status Mapping
// Description: Wire-level status codes derived from entity errors.
// Purpose: Let upstream surfaces report entity outcomes as HTTP-style codes.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! Maps each [`EntityError`] variant to a [`StatusCode`]. The mapping is
//! total and fixed: not-found is 404, conflict is 409, bad input is 400,
//! cancellation is 503, and everything else is 500.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use crate::error::EntityError;

// ============================================================================
// SECTION: Status Codes
// ============================================================================

/// HTTP-style status derived from an entity outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 400 Bad Request.
    BadRequest,
    /// 404 Not Found.
    NotFound,
    /// 409 Conflict.
    Conflict,
    /// 500 Internal Server Error.
    Internal,
    /// 503 Service Unavailable.
    ServiceUnavailable,
}

impl StatusCode {
    /// Returns the numeric status code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
            Self::ServiceUnavailable => 503,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

impl From<&EntityError> for StatusCode {
    fn from(error: &EntityError) -> Self {
        match error {
            EntityError::NotFound { .. } => Self::NotFound,
            EntityError::Conflict { .. } => Self::Conflict,
            EntityError::InvalidInput(_) => Self::BadRequest,
            EntityError::Cancelled(_) => Self::ServiceUnavailable,
            EntityError::InvariantViolation(_) | EntityError::Store { .. } => Self::Internal,
        }
    }
}

/// Returns true when `error` maps to `code`.
#[must_use]
pub fn status_matches(error: &EntityError, code: StatusCode) -> bool {
    StatusCode::from(error) == code
}
