// crates/tablekit-cluster/src/juju_user.rs
// ============================================================================
// Module: Juju User Entity
// Description: Descriptor, value type, filter, and typed CRUD wrappers.
// Purpose: Persist Juju user credentials keyed by username.
// Dependencies: tablekit-core, tablekit-store-sqlite
// ============================================================================

//! ## Overview
//! A Juju user is a `(username, token)` pair stored in the `jujuuser` table.
//! The username is the natural key; `id` is assigned by the store. The
//! wrappers below fix the generic operations to [`JujuUser`] so callers never
//! name the entity type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tablekit_core::ColumnDescriptor;
use tablekit_core::ColumnType;
use tablekit_core::Criterion;
use tablekit_core::Entity;
use tablekit_core::EntityDescriptor;
use tablekit_core::EntityError;
use tablekit_core::EntityFilter;
use tablekit_core::OperationContext;
use tablekit_core::RowError;
use tablekit_core::RowReader;
use tablekit_core::SqlValue;
use tablekit_store_sqlite::EntityTx;
use tablekit_store_sqlite::crud;
use tablekit_store_sqlite::mapper;

// ============================================================================
// SECTION: Descriptor
// ============================================================================

/// Descriptor of the `jujuuser` table.
pub static JUJU_USER: EntityDescriptor = EntityDescriptor {
    name: "JujuUser",
    table: "jujuuser",
    id_column: "id",
    columns: &[
        ColumnDescriptor::new("id", ColumnType::Integer),
        ColumnDescriptor::new("username", ColumnType::Text),
        ColumnDescriptor::new("token", ColumnType::Text),
    ],
    natural_key: &["username"],
    filters: &[&["username"]],
};

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stored Juju user credentials.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JujuUser {
    /// Surrogate key assigned at creation.
    pub id: i64,
    /// Unique username.
    pub username: String,
    /// Access token.
    pub token: String,
}

impl JujuUser {
    /// Builds an unsaved user; `id` is assigned by [`create_juju_user`].
    #[must_use]
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            token: token.into(),
        }
    }
}

/// Filter over Juju users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JujuUserFilter {
    /// Username to match.
    pub username: Option<String>,
}

impl JujuUserFilter {
    /// Filter matching one username.
    #[must_use]
    pub fn username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }
}

impl EntityFilter for JujuUserFilter {
    fn criteria(&self) -> Vec<Criterion> {
        self.username.iter().map(|username| Criterion::new("username", username)).collect()
    }
}

impl Entity for JujuUser {
    type Key = str;
    type Filter = JujuUserFilter;

    fn descriptor() -> &'static EntityDescriptor {
        &JUJU_USER
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn key_values(key: &str) -> Vec<SqlValue> {
        vec![SqlValue::from(key)]
    }

    fn natural_key_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::from(&self.username)]
    }

    fn key_filter(key: &str) -> JujuUserFilter {
        JujuUserFilter::username(key)
    }

    fn mutable_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::from(&self.username), SqlValue::from(&self.token)]
    }

    fn from_row(row: &mut RowReader) -> Result<Self, RowError> {
        Ok(Self {
            id: row.next_i64()?,
            username: row.next_text()?,
            token: row.next_text()?,
        })
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Returns the qualified column list for hand-written `jujuuser` queries.
#[must_use]
pub fn juju_user_columns() -> String {
    mapper::columns(&JUJU_USER)
}

/// Returns users matching any of `filters`, ordered by username.
///
/// # Errors
///
/// Returns [`EntityError::InvalidInput`] for empty filters and
/// [`EntityError::Store`] on driver failures.
pub fn get_juju_users(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    filters: &[JujuUserFilter],
) -> Result<Vec<JujuUser>, EntityError> {
    crud::get_many(tx, ctx, filters)
}

/// Runs a hand-written query returning [`juju_user_columns`].
///
/// # Errors
///
/// Returns [`EntityError::Store`] when the query fails or its columns do not
/// decode as a user.
pub fn get_juju_users_raw(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    sql: &str,
    args: &[SqlValue],
) -> Result<Vec<JujuUser>, EntityError> {
    mapper::select_with(tx, ctx, sql, args)
}

/// Returns the user named `username`.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] when no such user exists.
pub fn get_juju_user(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    username: &str,
) -> Result<JujuUser, EntityError> {
    crud::get_one(tx, ctx, username)
}

/// Returns the id of the user named `username`.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] when no such user exists.
pub fn get_juju_user_id(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    username: &str,
) -> Result<i64, EntityError> {
    crud::get_id::<JujuUser>(tx, ctx, username)
}

/// Returns whether a user named `username` exists.
///
/// # Errors
///
/// Returns [`EntityError`] for failures other than not-found.
pub fn juju_user_exists(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    username: &str,
) -> Result<bool, EntityError> {
    crud::exists::<JujuUser>(tx, ctx, username)
}

/// Stores `user` and returns its new id. `user.id` is ignored.
///
/// # Errors
///
/// Returns [`EntityError::Conflict`] when the username is taken.
pub fn create_juju_user(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    user: &JujuUser,
) -> Result<i64, EntityError> {
    crud::create(tx, ctx, user)
}

/// Deletes the user named `username`.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] when no such user exists.
pub fn delete_juju_user(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    username: &str,
) -> Result<(), EntityError> {
    crud::delete::<JujuUser>(tx, ctx, username)
}

/// Overwrites the user named `username` with `user`'s username and token.
///
/// # Errors
///
/// Returns [`EntityError::NotFound`] when no such user exists and
/// [`EntityError::Conflict`] when renaming onto a taken username.
pub fn update_juju_user(
    tx: &EntityTx<'_>,
    ctx: &OperationContext,
    username: &str,
    user: &JujuUser,
) -> Result<(), EntityError> {
    crud::update(tx, ctx, username, user)
}
