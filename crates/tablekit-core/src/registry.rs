// crates/tablekit-core/src/registry.rs
// ============================================================================
// Module: Statement Registry
// Description: Named SQL statements and per-entity standard statement sets.
// Purpose: Declare every statement once at startup and hand out copyable
//          handles that backends resolve against a live connection.
// Dependencies: thiserror, tracing, crate::{entity, query}
// ============================================================================

//! ## Overview
//! The registry is an explicit object built during startup and shared by
//! reference. It owns statement text; connections own prepared statements.
//! Registration is idempotent for identical text and fails closed when a name
//! is reused for different text.
//!
//! [`StatementRegistry::register_entity`] derives the standard statement set
//! for an entity from its descriptor: objects, objects-by-combination for each
//! supported filter, id lookup, create, delete-by-key, and update-by-id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::entity::DescriptorError;
use crate::entity::EntityDescriptor;
use crate::query::Dialect;
use crate::query::Predicate;
use crate::query::SelectQuery;
use crate::query::delete_by_key_sql;
use crate::query::insert_sql;
use crate::query::update_by_id_sql;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Statement registration failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A name was reused for different statement text.
    #[error("statement {name} already registered with different text")]
    NameConflict {
        /// Statement name.
        name: String,
    },
    /// An entity name was reused for a different descriptor.
    #[error("entity {entity} already registered with a different descriptor")]
    EntityConflict {
        /// Entity name.
        entity: &'static str,
    },
    /// The registry holds more statements than handles can address.
    #[error("statement registry is full")]
    Full,
    /// The descriptor failed validation.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

// ============================================================================
// SECTION: Handles
// ============================================================================

/// Opaque reference to registered statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementHandle(u32);

impl StatementHandle {
    /// Returns the handle's registry index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One registered statement.
#[derive(Debug, Clone)]
struct RegisteredStatement {
    /// Stable statement name.
    name: String,
    /// Rendered SQL text.
    text: String,
    /// Structured form, kept for SELECTs so they can be recombined.
    query: Option<SelectQuery>,
}

/// A filter combination and its dedicated statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterStatement {
    /// Fields in the order the statement binds them.
    pub fields: &'static [&'static str],
    /// Statement handle.
    pub handle: StatementHandle,
}

/// Standard statement set for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStatements {
    /// Entity descriptor the set was derived from.
    pub descriptor: &'static EntityDescriptor,
    /// Select every row ordered by natural key.
    pub objects: StatementHandle,
    /// Select by each supported filter combination.
    pub objects_by: Vec<FilterStatement>,
    /// Select the surrogate key by natural key.
    pub id: StatementHandle,
    /// Insert every mutable column.
    pub create: StatementHandle,
    /// Delete by natural key.
    pub delete_by_key: StatementHandle,
    /// Update every mutable column by surrogate key.
    pub update: StatementHandle,
}

impl EntityStatements {
    /// Finds the statement for a filter naming exactly `fields`, in any order.
    #[must_use]
    pub fn by_fields(&self, fields: &[&str]) -> Option<&FilterStatement> {
        let combination = self.descriptor.filter_combination(fields)?;
        self.objects_by.iter().find(|statement| statement.fields == combination)
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registered statements keyed by handle and by name.
#[derive(Debug, Clone, Default)]
pub struct StatementRegistry {
    /// Placeholder style used when rendering.
    dialect: Dialect,
    /// Statements indexed by handle.
    statements: Vec<RegisteredStatement>,
    /// Handle lookup by name.
    by_name: BTreeMap<String, StatementHandle>,
    /// Standard statement sets by entity name.
    entities: BTreeMap<&'static str, EntityStatements>,
}

impl StatementRegistry {
    /// Creates an empty registry rendering for `dialect`.
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Returns the dialect statements are rendered for.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Returns the number of registered statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Registers raw SQL text under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameConflict`] when `name` already holds
    /// different text.
    pub fn register(&mut self, name: &str, text: &str) -> Result<StatementHandle, RegistryError> {
        self.insert(name, text.to_string(), None)
    }

    /// Registers a structured SELECT under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameConflict`] when `name` already holds
    /// different text.
    pub fn register_query(
        &mut self,
        name: &str,
        query: SelectQuery,
    ) -> Result<StatementHandle, RegistryError> {
        let text = query.render(self.dialect);
        self.insert(name, text, Some(query))
    }

    /// Returns the text registered for `handle`.
    #[must_use]
    pub fn text_of(&self, handle: StatementHandle) -> Option<&str> {
        self.statements.get(handle.index()).map(|statement| statement.text.as_str())
    }

    /// Returns the name registered for `handle`.
    #[must_use]
    pub fn name_of(&self, handle: StatementHandle) -> Option<&str> {
        self.statements.get(handle.index()).map(|statement| statement.name.as_str())
    }

    /// Returns the structured query registered for `handle`, if any.
    #[must_use]
    pub fn query_of(&self, handle: StatementHandle) -> Option<&SelectQuery> {
        self.statements.get(handle.index()).and_then(|statement| statement.query.as_ref())
    }

    /// Looks up a handle by statement name.
    #[must_use]
    pub fn handle(&self, name: &str) -> Option<StatementHandle> {
        self.by_name.get(name).copied()
    }

    /// Returns the standard statement set registered for `entity`.
    #[must_use]
    pub fn entity(&self, entity: &str) -> Option<&EntityStatements> {
        self.entities.get(entity)
    }

    /// Registers the standard statement set for an entity.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the descriptor is invalid or any derived
    /// statement name is already bound to different text. A failed
    /// registration leaves the registry as it was.
    pub fn register_entity(
        &mut self,
        descriptor: &'static EntityDescriptor,
    ) -> Result<&EntityStatements, RegistryError> {
        descriptor.validate()?;
        if let Some(existing) = self.entities.get(descriptor.name) {
            if existing.descriptor != descriptor {
                return Err(RegistryError::EntityConflict {
                    entity: descriptor.name,
                });
            }
        } else {
            let start = self.statements.len();
            let statements = match self.derive_entity(descriptor) {
                Ok(statements) => statements,
                Err(err) => {
                    self.truncate(start);
                    return Err(err);
                }
            };
            debug!(
                entity = descriptor.name,
                table = descriptor.table,
                filters = statements.objects_by.len(),
                "registered entity statements"
            );
            self.entities.insert(descriptor.name, statements);
        }
        self.entities
            .get(descriptor.name)
            .ok_or(RegistryError::EntityConflict {
                entity: descriptor.name,
            })
    }

    /// Registers every statement derived from `descriptor`.
    fn derive_entity(
        &mut self,
        descriptor: &'static EntityDescriptor,
    ) -> Result<EntityStatements, RegistryError> {
        let prefix = lower_first(descriptor.name);
        let objects = self.register_query(&format!("{prefix}Objects"), SelectQuery::objects(descriptor))?;
        let mut objects_by = Vec::with_capacity(descriptor.filters.len());
        for fields in descriptor.filters {
            let predicate = Predicate::all_eq(fields.iter().map(|field| descriptor.qualified(field)));
            let name = format!("{prefix}ObjectsBy{}", join_pascal(fields));
            let handle =
                self.register_query(&name, SelectQuery::objects(descriptor).with_predicate(predicate))?;
            objects_by.push(FilterStatement {
                fields,
                handle,
            });
        }
        let id = self.register_query(&format!("{prefix}ID"), SelectQuery::id_by_key(descriptor))?;
        let create = self.register(&format!("{prefix}Create"), &insert_sql(descriptor, self.dialect))?;
        let delete_by_key = self.register(
            &format!("{prefix}DeleteBy{}", join_pascal(descriptor.natural_key)),
            &delete_by_key_sql(descriptor, self.dialect),
        )?;
        let update = self.register(&format!("{prefix}Update"), &update_by_id_sql(descriptor, self.dialect))?;
        Ok(EntityStatements {
            descriptor,
            objects,
            objects_by,
            id,
            create,
            delete_by_key,
            update,
        })
    }

    /// Drops every statement registered at or after index `len`.
    fn truncate(&mut self, len: usize) {
        self.statements.truncate(len);
        self.by_name.retain(|_, handle| handle.index() < len);
    }

    /// Stores a statement, enforcing name idempotency.
    fn insert(
        &mut self,
        name: &str,
        text: String,
        query: Option<SelectQuery>,
    ) -> Result<StatementHandle, RegistryError> {
        if let Some(handle) = self.by_name.get(name).copied() {
            let same = self.text_of(handle) == Some(text.as_str());
            return if same {
                Ok(handle)
            } else {
                Err(RegistryError::NameConflict {
                    name: name.to_string(),
                })
            };
        }
        let index = u32::try_from(self.statements.len()).map_err(|_| RegistryError::Full)?;
        let handle = StatementHandle(index);
        self.statements.push(RegisteredStatement {
            name: name.to_string(),
            text,
            query,
        });
        self.by_name.insert(name.to_string(), handle);
        Ok(handle)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Lowercases the first character (`JujuUser` becomes `jujuUser`).
fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

/// Joins snake-case fields as PascalCase words separated by `And`.
fn join_pascal(fields: &[&str]) -> String {
    fields.iter().map(|field| pascal(field)).collect::<Vec<_>>().join("And")
}

/// Converts a snake-case field to PascalCase (`node_role` becomes `NodeRole`).
fn pascal(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}
