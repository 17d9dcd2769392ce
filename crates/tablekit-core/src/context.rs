// crates/tablekit-core/src/context.rs
// ============================================================================
// Module: Operation Context
// Description: Deadlines and cooperative cancellation for entity operations.
// Purpose: Let callers bound or abort work without the core owning threads.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! Every entity operation receives an [`OperationContext`]. Backends call
//! [`OperationContext::check`] before each statement execution and between
//! rows; a passed deadline or a fired [`CancellationToken`] surfaces as
//! [`EntityError::Cancelled`]. Contexts are cheap to clone and can be shared
//! with the thread that fires the token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use crate::error::EntityError;

// ============================================================================
// SECTION: Cancellation Token
// ============================================================================

/// Shared flag that cancels every context holding it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    /// Set once cancelled.
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true once [`CancellationToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

// ============================================================================
// SECTION: Operation Context
// ============================================================================

/// Deadline and cancellation state for one unit of work.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Instant after which work must stop.
    deadline: Option<Instant>,
    /// Cooperative cancellation flag.
    cancel: Option<CancellationToken>,
}

impl OperationContext {
    /// Returns a context that never expires.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a context expiring `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    /// Returns a context expiring at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().deadline_at(deadline)
    }

    /// Returns a copy of this context that also observes `token`.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Sets the deadline, keeping the earlier one when already set.
    #[must_use]
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));
        self
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true when the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// Fails once the context is cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Cancelled`] naming the trigger.
    pub fn check(&self) -> Result<(), EntityError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(EntityError::Cancelled("cancellation requested".to_string()));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(EntityError::Cancelled("deadline exceeded".to_string()));
        }
        Ok(())
    }
}
