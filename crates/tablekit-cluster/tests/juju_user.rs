// crates/tablekit-cluster/tests/juju_user.rs
// ============================================================================
// Module: Juju User Tests
// Description: End-to-end tests of the Juju user wrappers over SQLite.
// Purpose: Pin the persisted layout and the create/read/update/delete
//          lifecycle of a single user.
// ============================================================================

//! ## Overview
//! Exercises the typed `JujuUser` wrappers against a database opened from a
//! default configuration in a temporary directory.

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

use tablekit_cluster::ClusterDatabase;
use tablekit_cluster::JUJU_USER;
use tablekit_cluster::JujuUser;
use tablekit_cluster::JujuUserFilter;
use tablekit_cluster::create_juju_user;
use tablekit_cluster::delete_juju_user;
use tablekit_cluster::get_juju_user;
use tablekit_cluster::get_juju_user_id;
use tablekit_cluster::get_juju_users;
use tablekit_cluster::get_juju_users_raw;
use tablekit_cluster::juju_user_columns;
use tablekit_cluster::juju_user_exists;
use tablekit_cluster::update_juju_user;
use tablekit_config::TablekitConfig;
use tablekit_core::EntityError;
use tablekit_core::OperationContext;
use tablekit_core::SqlValue;
use tablekit_core::StatusCode;
use tablekit_core::status_matches;
use tablekit_store_sqlite::create_table_sql;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens a fresh cluster database in a temporary directory.
fn open_database() -> (TempDir, ClusterDatabase) {
    let dir = TempDir::new().unwrap();
    let mut config = TablekitConfig::default();
    config.store.path = dir.path().join("cluster.db");
    let database = ClusterDatabase::open(&config).unwrap();
    (dir, database)
}

/// Creates `users` in one transaction.
fn seed(database: &ClusterDatabase, users: &[(&str, &str)]) {
    database
        .transaction(|tx| {
            let ctx = OperationContext::background();
            for (username, token) in users {
                create_juju_user(tx, &ctx, &JujuUser::new(*username, *token))?;
            }
            Ok(())
        })
        .unwrap();
}

// ============================================================================
// SECTION: Layout
// ============================================================================

#[test]
fn table_layout_matches_persisted_schema() {
    assert_eq!(
        create_table_sql(&JUJU_USER),
        "CREATE TABLE IF NOT EXISTS jujuuser (id INTEGER PRIMARY KEY, username TEXT UNIQUE, token TEXT)"
    );
    assert_eq!(juju_user_columns(), "jujuuser.id, jujuuser.username, jujuuser.token");
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

#[test]
fn alice_lifecycle() {
    let (_dir, database) = open_database();
    let ctx = OperationContext::background();

    let id = database.transaction(|tx| create_juju_user(tx, &ctx, &JujuUser::new("alice", "t1"))).unwrap();
    assert_eq!(id, 1);

    let conflict =
        database.transaction(|tx| create_juju_user(tx, &ctx, &JujuUser::new("alice", "t2"))).unwrap_err();
    assert_eq!(conflict.to_string(), "This \"jujuuser\" entry already exists");
    assert!(status_matches(&conflict, StatusCode::Conflict));

    let loaded = database.transaction(|tx| get_juju_user(tx, &ctx, "alice")).unwrap();
    assert_eq!(
        loaded,
        JujuUser {
            id: 1,
            username: "alice".to_string(),
            token: "t1".to_string(),
        }
    );

    database.transaction(|tx| update_juju_user(tx, &ctx, "alice", &JujuUser::new("alice", "t2"))).unwrap();
    let updated = database.transaction(|tx| get_juju_user(tx, &ctx, "alice")).unwrap();
    assert_eq!(updated.token, "t2");
    assert_eq!(updated.id, 1);

    database.transaction(|tx| delete_juju_user(tx, &ctx, "alice")).unwrap();
    let missing = database.transaction(|tx| get_juju_user(tx, &ctx, "alice")).unwrap_err();
    assert_eq!(
        missing,
        EntityError::NotFound {
            entity: "JujuUser"
        }
    );
    assert!(status_matches(&missing, StatusCode::NotFound));
}

#[test]
fn id_and_existence_lookups() {
    let (_dir, database) = open_database();
    seed(&database, &[("alice", "t1"), ("bob", "t2")]);
    database
        .transaction(|tx| {
            let ctx = OperationContext::background();
            assert_eq!(get_juju_user_id(tx, &ctx, "bob")?, 2);
            assert!(juju_user_exists(tx, &ctx, "alice")?);
            assert!(!juju_user_exists(tx, &ctx, "carol")?);
            assert!(get_juju_user_id(tx, &ctx, "carol").unwrap_err().is_not_found());
            Ok(())
        })
        .unwrap();
}

#[test]
fn update_and_delete_of_absent_user_are_not_found() {
    let (_dir, database) = open_database();
    let ctx = OperationContext::background();
    let update = database
        .transaction(|tx| update_juju_user(tx, &ctx, "ghost", &JujuUser::new("ghost", "t")))
        .unwrap_err();
    assert!(update.is_not_found());
    let delete = database.transaction(|tx| delete_juju_user(tx, &ctx, "ghost")).unwrap_err();
    assert!(delete.is_not_found());
}

// ============================================================================
// SECTION: Filtered Reads
// ============================================================================

#[test]
fn filtered_reads_are_ordered_by_username() {
    let (_dir, database) = open_database();
    seed(&database, &[("carol", "t3"), ("alice", "t1"), ("bob", "t2")]);
    let ctx = OperationContext::background();
    let all = database.transaction(|tx| get_juju_users(tx, &ctx, &[])).unwrap();
    let names: Vec<&str> = all.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carol"]);

    let filters = [JujuUserFilter::username("carol"), JujuUserFilter::username("alice")];
    let some = database.transaction(|tx| get_juju_users(tx, &ctx, &filters)).unwrap();
    let names: Vec<&str> = some.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "carol"]);

    let none = database.transaction(|tx| get_juju_users(tx, &ctx, &[JujuUserFilter::username("dave")])).unwrap();
    assert!(none.is_empty());
}

#[test]
fn empty_filter_is_rejected() {
    let (_dir, database) = open_database();
    let err = database
        .transaction(|tx| get_juju_users(tx, &OperationContext::background(), &[JujuUserFilter::default()]))
        .unwrap_err();
    assert_eq!(err, EntityError::InvalidInput("cannot filter on empty JujuUserFilter".to_string()));
    assert!(status_matches(&err, StatusCode::BadRequest));
}

#[test]
fn raw_query_decodes_users() {
    let (_dir, database) = open_database();
    seed(&database, &[("alice", "t1"), ("bob", "t2")]);
    let sql = format!("SELECT {} FROM jujuuser WHERE jujuuser.token = ?", juju_user_columns());
    let users = database
        .transaction(|tx| get_juju_users_raw(tx, &OperationContext::background(), &sql, &[SqlValue::from("t2")]))
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "bob");
}
