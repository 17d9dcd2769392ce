// crates/tablekit-core/src/telemetry.rs
// ============================================================================
// Module: Entity Telemetry
// Description: Observability hooks for entity operations.
// Purpose: Provide operation events and latency buckets without hard deps.
// Dependencies: tracing, crate::error
// ============================================================================

//! ## Overview
//! This module exposes a thin metrics interface for per-operation counters
//! and latency histograms. Deployments plug in their own sink; the built-in
//! sinks discard events ([`NoopMetrics`]) or forward them to `tracing`
//! ([`TracingMetrics`]). Labels never include argument values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use tracing::debug;

use crate::error::EntityError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default latency buckets in milliseconds for operation histograms.
pub const OPERATION_LATENCY_BUCKETS_MS: &[u64] =
    &[1, 2, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000];

// ============================================================================
// SECTION: Metric Labels
// ============================================================================

/// Entity operation classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Multi-row filtered read.
    GetMany,
    /// Single-row read by natural key.
    GetOne,
    /// Surrogate key lookup.
    GetId,
    /// Existence check.
    Exists,
    /// Insert.
    Create,
    /// Delete by natural key.
    Delete,
    /// Update by natural key.
    Update,
}

impl Operation {
    /// Returns a stable label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetMany => "get_many",
            Self::GetOne => "get_one",
            Self::GetId => "get_id",
            Self::Exists => "exists",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Update => "update",
        }
    }
}

/// Entity operation outcome classification.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Operation succeeded.
    Ok,
    /// Target was absent.
    NotFound,
    /// Natural key already present.
    Conflict,
    /// Caller input rejected.
    InvalidInput,
    /// Row count invariant broken.
    InvariantViolation,
    /// Store failure.
    StoreError,
    /// Deadline or cancellation.
    Cancelled,
}

impl Outcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidInput => "invalid_input",
            Self::InvariantViolation => "invariant_violation",
            Self::StoreError => "store_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Classifies an operation result.
    #[must_use]
    pub const fn of<T>(result: &Result<T, EntityError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(error) => Self::from_error(error),
        }
    }

    /// Classifies an operation error.
    #[must_use]
    pub const fn from_error(error: &EntityError) -> Self {
        match error {
            EntityError::NotFound { .. } => Self::NotFound,
            EntityError::Conflict { .. } => Self::Conflict,
            EntityError::InvalidInput(_) => Self::InvalidInput,
            EntityError::InvariantViolation(_) => Self::InvariantViolation,
            EntityError::Store { .. } => Self::StoreError,
            EntityError::Cancelled(_) => Self::Cancelled,
        }
    }
}

/// Entity operation metric event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationEvent {
    /// Entity name.
    pub entity: &'static str,
    /// Table name.
    pub table: &'static str,
    /// Operation performed.
    pub operation: Operation,
    /// Operation outcome.
    pub outcome: Outcome,
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for entity operations.
pub trait EntityMetrics: Send + Sync {
    /// Records an operation counter event.
    fn record_operation(&self, event: OperationEvent);
    /// Records a latency observation for the operation.
    fn record_latency(&self, event: OperationEvent, latency: Duration);
}

/// No-op metrics sink.
///
/// # Invariants
/// - Metrics are intentionally discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl EntityMetrics for NoopMetrics {
    fn record_operation(&self, _event: OperationEvent) {}

    fn record_latency(&self, _event: OperationEvent, _latency: Duration) {}
}

/// Metrics sink that forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetrics;

impl EntityMetrics for TracingMetrics {
    fn record_operation(&self, event: OperationEvent) {
        debug!(
            entity = event.entity,
            table = event.table,
            operation = event.operation.as_str(),
            outcome = event.outcome.as_str(),
            "entity operation"
        );
    }

    fn record_latency(&self, event: OperationEvent, latency: Duration) {
        debug!(
            entity = event.entity,
            operation = event.operation.as_str(),
            outcome = event.outcome.as_str(),
            latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX),
            "entity operation latency"
        );
    }
}
