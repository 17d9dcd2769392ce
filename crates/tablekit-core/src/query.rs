// crates/tablekit-core/src/query.rs
// ============================================================================
// Module: Query Fragments
// Description: Predicate tree and statement renderers for entity tables.
// Purpose: Compose filtered SELECTs structurally and render them to a SQL
//          dialect at the last moment.
// Dependencies: serde, crate::entity
// ============================================================================

//! ## Overview
//! Every statement the registry stores is rendered from the fragments here.
//! [`SelectQuery`] keeps its column list, predicate tree, and ordering apart,
//! so the filter compiler can OR several registered predicates together
//! without touching SQL text. Placeholders are numbered left to right during
//! rendering, which keeps argument order equal to predicate order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use serde::Deserialize;
use serde::Serialize;

use crate::entity::EntityDescriptor;

// ============================================================================
// SECTION: Dialect
// ============================================================================

/// Placeholder style of the target SQL dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Anonymous `?` placeholders.
    #[default]
    Positional,
    /// Numbered `?1`, `?2`, ... placeholders.
    Numbered,
}

impl Dialect {
    /// Returns the placeholder for the one-based argument `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Positional => "?".to_string(),
            Self::Numbered => format!("?{index}"),
        }
    }

    /// Returns a stable label for logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positional => "positional",
            Self::Numbered => "numbered",
        }
    }
}

/// Placeholder numbering state for one rendered statement.
struct Placeholders {
    /// Target dialect.
    dialect: Dialect,
    /// Number of placeholders emitted so far.
    emitted: usize,
}

impl Placeholders {
    /// Starts numbering at one.
    const fn new(dialect: Dialect) -> Self {
        Self { dialect, emitted: 0 }
    }

    /// Emits the next placeholder.
    fn next(&mut self) -> String {
        self.emitted += 1;
        self.dialect.placeholder(self.emitted)
    }
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Boolean predicate over qualified columns.
///
/// # Invariants
/// - Each [`Predicate::Eq`] consumes exactly one argument.
/// - Arguments bind in left-to-right rendering order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = ?`.
    Eq(String),
    /// Parenthesized conjunction.
    All(Vec<Predicate>),
    /// Disjunction, parenthesized when nested.
    Any(Vec<Predicate>),
}

impl Predicate {
    /// Builds a parenthesized conjunction of equality tests.
    #[must_use]
    pub fn all_eq<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::All(columns.into_iter().map(|column| Self::Eq(column.into())).collect())
    }

    /// Returns the number of arguments the predicate binds.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        match self {
            Self::Eq(_) => 1,
            Self::All(items) | Self::Any(items) => items.iter().map(Self::placeholder_count).sum(),
        }
    }

    /// Renders the predicate, numbering placeholders from `placeholders`.
    fn render_into(&self, out: &mut String, placeholders: &mut Placeholders, nested: bool) {
        match self {
            Self::Eq(column) => {
                let _ = write!(out, "{column} = {}", placeholders.next());
            }
            Self::All(items) if items.is_empty() => out.push_str("( 1 = 1 )"),
            Self::Any(items) if items.is_empty() => out.push_str("( 1 = 0 )"),
            Self::All(items) => {
                out.push_str("( ");
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push_str(" AND ");
                    }
                    item.render_into(out, placeholders, true);
                }
                out.push_str(" )");
            }
            Self::Any(items) => {
                if nested {
                    out.push_str("( ");
                }
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push_str(" OR ");
                    }
                    item.render_into(out, placeholders, true);
                }
                if nested {
                    out.push_str(" )");
                }
            }
        }
    }

    /// Renders the predicate as a standalone WHERE body.
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> String {
        let mut out = String::new();
        let mut placeholders = Placeholders::new(dialect);
        self.render_into(&mut out, &mut placeholders, false);
        out
    }
}

// ============================================================================
// SECTION: Select Queries
// ============================================================================

/// A structured SELECT statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// Source table.
    pub table: String,
    /// Qualified result columns.
    pub columns: Vec<String>,
    /// Optional WHERE predicate.
    pub predicate: Option<Predicate>,
    /// Qualified ordering columns, ascending.
    pub order_by: Vec<String>,
}

impl SelectQuery {
    /// Selects every column of an entity, ordered by its natural key.
    #[must_use]
    pub fn objects(descriptor: &EntityDescriptor) -> Self {
        Self {
            table: descriptor.table.to_string(),
            columns: descriptor.column_names().map(|name| descriptor.qualified(name)).collect(),
            predicate: None,
            order_by: descriptor.natural_key.iter().map(|name| descriptor.qualified(name)).collect(),
        }
    }

    /// Selects the entity's surrogate key by its natural key.
    #[must_use]
    pub fn id_by_key(descriptor: &EntityDescriptor) -> Self {
        let mut keys: Vec<Predicate> =
            descriptor.natural_key.iter().map(|name| Predicate::Eq(descriptor.qualified(name))).collect();
        let predicate = if keys.len() == 1 { keys.remove(0) } else { Predicate::All(keys) };
        Self {
            table: descriptor.table.to_string(),
            columns: vec![descriptor.qualified(descriptor.id_column)],
            predicate: Some(predicate),
            order_by: Vec::new(),
        }
    }

    /// Returns the query with `predicate` as its WHERE clause.
    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Returns the number of arguments the query binds.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.predicate.as_ref().map_or(0, Predicate::placeholder_count)
    }

    /// Renders the query for `dialect`.
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> String {
        let mut out = format!("SELECT {} FROM {}", self.columns.join(", "), self.table);
        if let Some(predicate) = &self.predicate {
            out.push_str(" WHERE ");
            let mut placeholders = Placeholders::new(dialect);
            predicate.render_into(&mut out, &mut placeholders, false);
        }
        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            out.push_str(&self.order_by.join(", "));
        }
        out
    }
}

// ============================================================================
// SECTION: Mutation Statements
// ============================================================================

/// Renders the INSERT of every mutable column.
#[must_use]
pub fn insert_sql(descriptor: &EntityDescriptor, dialect: Dialect) -> String {
    let mut placeholders = Placeholders::new(dialect);
    let columns: Vec<&str> = descriptor.mutable_columns().map(|column| column.name).collect();
    let values: Vec<String> = columns.iter().map(|_| placeholders.next()).collect();
    format!("INSERT INTO {} ({}) VALUES ({})", descriptor.table, columns.join(", "), values.join(", "))
}

/// Renders the UPDATE of every mutable column by surrogate key.
#[must_use]
pub fn update_by_id_sql(descriptor: &EntityDescriptor, dialect: Dialect) -> String {
    let mut placeholders = Placeholders::new(dialect);
    let assignments: Vec<String> = descriptor
        .mutable_columns()
        .map(|column| format!("{} = {}", column.name, placeholders.next()))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = {}",
        descriptor.table,
        assignments.join(", "),
        descriptor.id_column,
        placeholders.next()
    )
}

/// Renders the DELETE by natural key.
#[must_use]
pub fn delete_by_key_sql(descriptor: &EntityDescriptor, dialect: Dialect) -> String {
    let mut placeholders = Placeholders::new(dialect);
    let conditions: Vec<String> = descriptor
        .natural_key
        .iter()
        .map(|name| format!("{name} = {}", placeholders.next()))
        .collect();
    format!("DELETE FROM {} WHERE {}", descriptor.table, conditions.join(" AND "))
}
