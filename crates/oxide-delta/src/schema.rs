//! Schema representation types.
//!
//! These types describe one table's columns and indexes. The same model is
//! produced from declared `CREATE TABLE` text (see [`crate::extract`]) and
//! from live introspection (see [`crate::introspect`]), so the differ can
//! compare the two directly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name, case preserved.
    pub name: String,
    /// The full definition as written, e.g. `` `id` bigint unsigned NOT NULL``.
    pub raw_clause: String,
    /// The column type, e.g. `bigint unsigned` or `varchar(255)`.
    pub type_token: String,
    /// Literal default value, unescaped.
    pub default_literal: Option<String>,
}

impl ColumnDef {
    /// Creates a new column definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        raw_clause: impl Into<String>,
        type_token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            raw_clause: raw_clause.into(),
            type_token: type_token.into(),
            default_literal: None,
        }
    }

    /// Sets the literal default value.
    #[must_use]
    pub fn default_literal(mut self, value: impl Into<String>) -> Self {
        self.default_literal = Some(value.into());
        self
    }

    /// Returns the lower-cased name used for lookups.
    #[must_use]
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// The kind of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    /// `PRIMARY KEY`.
    Primary,
    /// `UNIQUE KEY`.
    Unique,
    /// `FULLTEXT KEY`.
    Fulltext,
    /// `SPATIAL KEY`.
    Spatial,
    /// Plain `KEY`.
    Key,
}

impl IndexKind {
    /// Returns the canonical SQL keyword(s) for this kind.
    #[must_use]
    pub fn to_sql(self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY KEY",
            Self::Unique => "UNIQUE KEY",
            Self::Fulltext => "FULLTEXT KEY",
            Self::Spatial => "SPATIAL KEY",
            Self::Key => "KEY",
        }
    }

    /// Parses a normalized type token (`INDEX` already folded to `KEY`).
    #[must_use]
    pub fn from_sql(token: &str) -> Option<Self> {
        match token {
            "PRIMARY KEY" => Some(Self::Primary),
            "UNIQUE KEY" => Some(Self::Unique),
            "FULLTEXT KEY" => Some(Self::Fulltext),
            "SPATIAL KEY" => Some(Self::Spatial),
            "KEY" => Some(Self::Key),
            _ => None,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// One column of an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// Number of leading characters indexed (MySQL "sub part").
    pub prefix_length: Option<u32>,
}

impl IndexColumn {
    /// Creates an index column covering the whole column.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix_length: None,
        }
    }

    /// Creates an index column covering the first `length` characters.
    #[must_use]
    pub fn prefixed(name: impl Into<String>, length: u32) -> Self {
        Self {
            name: name.into(),
            prefix_length: Some(length),
        }
    }
}

/// An index definition with its two canonical renderings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    kind: IndexKind,
    name: String,
    columns: Vec<IndexColumn>,
    algorithm: Option<String>,
    canonical: String,
    canonical_no_prefix: String,
}

impl IndexDef {
    /// Creates an index. The name is lower-cased and dropped for primary keys.
    #[must_use]
    pub fn new(kind: IndexKind, name: &str, columns: Vec<IndexColumn>) -> Self {
        let name = if kind == IndexKind::Primary {
            String::new()
        } else {
            name.to_lowercase()
        };
        let canonical = render(kind, &name, &columns, true);
        let canonical_no_prefix = render(kind, &name, &columns, false);
        Self {
            kind,
            name,
            columns,
            algorithm: None,
            canonical,
            canonical_no_prefix,
        }
    }

    /// Records the index algorithm reported by the server (`BTREE`, ...).
    #[must_use]
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Returns the index kind.
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Returns the lower-cased index name (empty for primary keys).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the indexed columns in order.
    #[must_use]
    pub fn columns(&self) -> &[IndexColumn] {
        &self.columns
    }

    /// Returns the index algorithm, if known.
    #[must_use]
    pub fn index_algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    /// Returns whether the index enforces uniqueness.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        matches!(self.kind, IndexKind::Primary | IndexKind::Unique)
    }

    /// Canonical form including prefix lengths, e.g.
    /// ``UNIQUE KEY `slug` (`slug`(20),`taxonomy`)``.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Canonical form without prefix lengths; used as the index identity.
    #[must_use]
    pub fn canonical_no_prefix(&self) -> &str {
        &self.canonical_no_prefix
    }
}

fn render(kind: IndexKind, name: &str, columns: &[IndexColumn], with_prefix: bool) -> String {
    let columns: Vec<String> = columns
        .iter()
        .map(|c| match c.prefix_length {
            Some(len) if with_prefix => format!("`{}`({})", c.name, len),
            _ => format!("`{}`", c.name),
        })
        .collect();

    if name.is_empty() {
        format!("{} ({})", kind, columns.join(","))
    } else {
        format!("{} `{}` ({})", kind, name, columns.join(","))
    }
}

/// Columns and indexes of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Column definitions in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Index definitions in declaration order.
    pub indexes: Vec<IndexDef>,
}

impl TableSchema {
    /// Creates an empty table schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index to the table.
    #[must_use]
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Gets a column by name, case-insensitively.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Gets an index by its (lower-cased) name.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        let name = name.to_lowercase();
        self.indexes.iter().find(|i| i.name == name)
    }
}
