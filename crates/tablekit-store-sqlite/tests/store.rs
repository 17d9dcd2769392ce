// crates/tablekit-store-sqlite/tests/store.rs
// ============================================================================
// Module: SQLite Store Tests
// Description: Configuration, schema, transaction, and cancellation tests.
// Purpose: Validate the transaction owner and connection plumbing around the
//          entity operations.
// ============================================================================

//! ## Overview
//! Integration tests for `SqliteEntityStore`:
//! - configuration and path validation fail closed
//! - schema bootstrap records and enforces its version
//! - transactions commit on success and roll back on failure
//! - cancelled contexts and interrupts surface as cancellation without
//!   mutation

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod support;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use support::NODE;
use support::NODE_SCHEMA;
use support::Node;
use support::node_registry;
use support::open_store;
use support::open_with;
use tablekit_core::CancellationToken;
use tablekit_core::Dialect;
use tablekit_core::EntityError;
use tablekit_core::EntityMetrics;
use tablekit_core::MAX_PATH_COMPONENT_LENGTH;
use tablekit_core::MAX_TOTAL_PATH_LENGTH;
use tablekit_core::Operation;
use tablekit_core::OperationContext;
use tablekit_core::OperationEvent;
use tablekit_core::Outcome;
use tablekit_core::StatusCode;
use tablekit_core::status_matches;
use tablekit_store_sqlite::Schema;
use tablekit_store_sqlite::SqliteEntityStore;
use tablekit_store_sqlite::SqliteStoreConfig;
use tablekit_store_sqlite::SqliteStoreError;
use tablekit_store_sqlite::SqliteTransactionBehavior;
use tablekit_store_sqlite::create_table_sql;
use tablekit_store_sqlite::crud;
use tablekit_store_sqlite::mapper;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Metrics sink that keeps every recorded event.
#[derive(Default)]
struct RecordingMetrics {
    /// Recorded events.
    events: Mutex<Vec<OperationEvent>>,
}

impl EntityMetrics for RecordingMetrics {
    fn record_operation(&self, event: OperationEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn record_latency(&self, _event: OperationEvent, _latency: Duration) {}
}

/// Counts node rows in a fresh transaction.
fn count(store: &SqliteEntityStore) -> usize {
    store
        .transaction(|tx| crud::get_many::<Node>(tx, &OperationContext::background(), &[]))
        .unwrap()
        .len()
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

#[test]
fn config_defaults_are_applied() {
    let config = SqliteStoreConfig::new("store.db");
    assert_eq!(config.busy_timeout_ms, 5_000);
    assert_eq!(config.statement_cache_capacity, 64);
    assert_eq!(config.transaction_behavior, SqliteTransactionBehavior::Immediate);
    config.validate().unwrap();
}

#[test]
fn config_rejects_out_of_range_values() {
    let mut config = SqliteStoreConfig::new("store.db");
    config.statement_cache_capacity = 0;
    assert!(matches!(config.validate(), Err(SqliteStoreError::Invalid(_))));
    let mut config = SqliteStoreConfig::new("store.db");
    config.busy_timeout_ms = 3_600_000;
    assert!(matches!(config.validate(), Err(SqliteStoreError::Invalid(_))));
    let config = SqliteStoreConfig::new("");
    assert!(matches!(config.validate(), Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn config_applies_shared_path_limits() {
    let err = SqliteStoreConfig::new("").validate().unwrap_err();
    assert_eq!(err, SqliteStoreError::Invalid("store path must not be empty".to_string()));
    let err = SqliteStoreConfig::new("a".repeat(MAX_TOTAL_PATH_LENGTH + 1)).validate().unwrap_err();
    assert_eq!(err, SqliteStoreError::Invalid("store path exceeds max length".to_string()));
    let nested = std::path::Path::new("data").join("s".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
    let err = SqliteStoreConfig::new(nested).validate().unwrap_err();
    assert_eq!(err, SqliteStoreError::Invalid("store path component too long".to_string()));
}

#[test]
fn open_rejects_directory_path() {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(dir.path());
    let err = SqliteEntityStore::open(config, node_registry(Dialect::Positional)).err().unwrap();
    assert_eq!(err, SqliteStoreError::Invalid("store path must be a file, not a directory".to_string()));
}

#[test]
fn open_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(dir.path().join("nested").join("store.db"));
    let store = SqliteEntityStore::open(config, node_registry(Dialect::Positional)).unwrap();
    store.readiness().unwrap();
}

// ============================================================================
// SECTION: Schema
// ============================================================================

#[test]
fn create_table_sql_preserves_column_order_and_uniqueness() {
    assert_eq!(
        create_table_sql(&NODE),
        "CREATE TABLE IF NOT EXISTS nodes (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE, role TEXT NOT NULL, address TEXT)"
    );
}

#[test]
fn schema_version_is_recorded_and_reapplied_idempotently() {
    let dir = TempDir::new().unwrap();
    let store = open_with(&dir, |_| {});
    store.apply_schema(&NODE_SCHEMA).unwrap();
    drop(store);
    let store = open_with(&dir, |_| {});
    store.readiness().unwrap();
    assert_eq!(count(&store), 0);
}

#[test]
fn newer_stored_schema_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = open_with(&dir, |_| {});
    let newer = Schema {
        version: 2,
        entities: NODE_SCHEMA.entities,
    };
    store.apply_schema(&newer).unwrap();
    let err = store.apply_schema(&NODE_SCHEMA).unwrap_err();
    assert_eq!(err, SqliteStoreError::VersionMismatch("unsupported schema version: 2".to_string()));
}

// ============================================================================
// SECTION: Transactions
// ============================================================================

#[test]
fn failed_unit_of_work_rolls_back() {
    let (_dir, store) = open_store();
    let err = store
        .transaction(|tx| {
            let ctx = OperationContext::background();
            crud::create(tx, &ctx, &Node::new("a", "voter"))?;
            crud::create(tx, &ctx, &Node::new("a", "voter"))
        })
        .unwrap_err();
    assert_eq!(err, EntityError::Conflict { table: "nodes" });
    assert_eq!(count(&store), 0);
}

#[test]
fn statements_stay_usable_with_minimal_cache_capacity() {
    let dir = TempDir::new().unwrap();
    let store = open_with(&dir, |config| config.statement_cache_capacity = 1);
    for round in 0 .. 3 {
        store
            .transaction(|tx| {
                let ctx = OperationContext::background();
                let name = format!("n{round}");
                crud::create(tx, &ctx, &Node::new(&name, "voter"))?;
                assert!(crud::exists::<Node>(tx, &ctx, &name)?);
                crud::get_one::<Node>(tx, &ctx, &name)?;
                Ok(())
            })
            .unwrap();
    }
    assert_eq!(count(&store), 3);
}

#[test]
fn each_operation_records_one_metric_event() {
    let dir = TempDir::new().unwrap();
    let metrics = Arc::new(RecordingMetrics::default());
    let store = open_with(&dir, |_| {}).with_metrics(Arc::clone(&metrics) as Arc<dyn EntityMetrics>);
    store
        .transaction(|tx| {
            let ctx = OperationContext::background();
            crud::create(tx, &ctx, &Node::new("a", "voter"))?;
            let missing = crud::get_one::<Node>(tx, &ctx, "b");
            assert!(missing.is_err());
            Ok(())
        })
        .unwrap();
    let events = metrics.events.lock().unwrap();
    let summary: Vec<(Operation, Outcome)> = events.iter().map(|event| (event.operation, event.outcome)).collect();
    assert_eq!(summary, vec![(Operation::Create, Outcome::Ok), (Operation::GetOne, Outcome::NotFound)]);
    assert!(events.iter().all(|event| event.table == "nodes"));
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

#[test]
fn cancelled_context_performs_no_mutation() {
    let (_dir, store) = open_store();
    let token = CancellationToken::new();
    token.cancel();
    let ctx = OperationContext::background().with_cancellation(token);
    let err = store.transaction(|tx| crud::create(tx, &ctx, &Node::new("a", "voter"))).unwrap_err();
    assert!(matches!(err, EntityError::Cancelled(_)));
    assert!(status_matches(&err, StatusCode::ServiceUnavailable));
    assert_eq!(count(&store), 0);
}

#[test]
fn expired_deadline_is_cancelled() {
    let (_dir, store) = open_store();
    let ctx = OperationContext::with_deadline(Instant::now());
    let err = store.transaction(|tx| crud::get_many::<Node>(tx, &ctx, &[])).unwrap_err();
    assert_eq!(err, EntityError::Cancelled("deadline exceeded".to_string()));
}

#[test]
fn interrupt_aborts_running_statement() {
    let (_dir, store) = open_store();
    let store = Arc::new(store);
    let done = Arc::new(AtomicBool::new(false));
    let interrupter = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(20));
                store.interrupt();
            }
        })
    };
    let endless = "SELECT 1, 'n', 'voter', NULL FROM (WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT x FROM c WHERE x < 0 LIMIT 1)";
    let result =
        store.transaction(|tx| mapper::select_with::<Node>(tx, &OperationContext::background(), endless, &[]));
    done.store(true, Ordering::Release);
    interrupter.join().unwrap();
    assert!(matches!(result, Err(EntityError::Cancelled(_))));
    store.readiness().unwrap();
}
