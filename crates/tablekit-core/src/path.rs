// crates/tablekit-core/src/path.rs
// ============================================================================
// Module: Path Limits
// Description: Length limits shared by every configured filesystem path.
// Purpose: Apply one set of path rules to store files and config files.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`check_path_limits`] rejects empty paths, paths longer than
//! [`MAX_TOTAL_PATH_LENGTH`] bytes, and paths with a component longer than
//! [`MAX_PATH_COMPONENT_LENGTH`] bytes. Callers prefix the error with the
//! path's role, for example `store path exceeds max length`.

use std::path::Path;

use thiserror::Error;

/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Path limit violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathLimitError {
    /// The path is empty.
    #[error("must not be empty")]
    Empty,
    /// The path exceeds [`MAX_TOTAL_PATH_LENGTH`].
    #[error("exceeds max length")]
    TooLong,
    /// A component exceeds [`MAX_PATH_COMPONENT_LENGTH`].
    #[error("component too long")]
    ComponentTooLong,
}

/// Checks `path` against the shared length limits.
///
/// # Errors
///
/// Returns [`PathLimitError`] naming the first violated limit.
pub fn check_path_limits(path: &Path) -> Result<(), PathLimitError> {
    if path.as_os_str().is_empty() {
        return Err(PathLimitError::Empty);
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(PathLimitError::TooLong);
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH) {
        return Err(PathLimitError::ComponentTooLong);
    }
    Ok(())
}
