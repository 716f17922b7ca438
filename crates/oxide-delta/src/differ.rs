//! Desired vs. live table comparison.
//!
//! The differ only ever adds: new columns, wider or different column types,
//! changed defaults and missing indexes. Columns and indexes present only in
//! the live table are left alone.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::schema::{ColumnDef, TableSchema};

/// Text types in ascending capacity.
pub const TEXT_FIELDS: &[&str] = &["tinytext", "text", "mediumtext", "longtext"];

/// Blob types in ascending capacity.
pub const BLOB_FIELDS: &[&str] = &["tinyblob", "blob", "mediumblob", "longblob"];

/// Integer types whose display width newer MySQL servers no longer report.
pub const INT_FIELDS: &[&str] = &["tinyint", "smallint", "mediumint", "int", "integer", "bigint"];

static DISPLAY_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+\)").expect("Invalid display width regex"));

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("Invalid numeric regex"));

/// Differ configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifferOptions {
    /// Treat `int(11)` and `int` as the same type.
    pub ignore_integer_display_width: bool,
}

impl DifferOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether integer display widths are ignored.
    #[must_use]
    pub fn ignore_integer_display_width(mut self, ignore: bool) -> Self {
        self.ignore_integer_display_width = ignore;
        self
    }
}

/// The kind of a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// `ALTER TABLE ... ADD COLUMN`.
    AddColumn,
    /// `ALTER TABLE ... CHANGE COLUMN`.
    ChangeColumn,
    /// `ALTER TABLE ... ALTER COLUMN ... SET DEFAULT`.
    SetDefault,
    /// `ALTER TABLE ... ADD <index>`.
    AddIndex,
}

/// One DDL statement with its report entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What the statement does.
    pub kind: ChangeKind,
    /// The table it applies to.
    pub table: String,
    /// The statement to execute.
    pub statement: String,
    /// Report key; a later change with the same key replaces the message.
    pub report_key: String,
    /// Human readable description.
    pub report_message: String,
}

/// Ordered changes for one or more tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a change.
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Appends all changes of another set.
    pub fn extend(&mut self, other: ChangeSet) {
        self.changes.extend(other.changes);
    }

    /// Returns true if there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the number of changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Iterates over the changes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Returns the statements in order.
    #[must_use]
    pub fn statements(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.statement.as_str()).collect()
    }

    /// Returns the changes of one kind.
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Compares a desired table against its live counterpart.
#[derive(Debug, Clone, Copy, Default)]
pub struct Differ {
    options: DifferOptions,
}

impl Differ {
    /// Creates a differ.
    #[must_use]
    pub fn new(options: DifferOptions) -> Self {
        Self { options }
    }

    /// Returns the options in use.
    #[must_use]
    pub fn options(&self) -> DifferOptions {
        self.options
    }

    /// Computes the changes that bring `live` up to `desired`.
    ///
    /// Column changes come first, in desired column order, followed by the
    /// missing indexes in desired index order.
    #[must_use]
    pub fn diff_table(&self, desired: &TableSchema, live: &TableSchema) -> ChangeSet {
        let table = desired.name.as_str();
        let mut changes = ChangeSet::new();

        for column in &desired.columns {
            match live.get_column(&column.name) {
                None => changes.push(Change {
                    kind: ChangeKind::AddColumn,
                    table: table.to_string(),
                    statement: format!("ALTER TABLE {table} ADD COLUMN {}", column.raw_clause),
                    report_key: format!("{table}.{}", column.name),
                    report_message: format!("Added column {table}.{}", column.name),
                }),
                Some(existing) => self.diff_column(table, column, existing, &mut changes),
            }
        }

        let mut remaining: Vec<_> = desired.indexes.iter().map(Some).collect();
        for index in &live.indexes {
            let matched = remaining.iter_mut().find(|slot| {
                slot.is_some_and(|wanted| wanted.canonical_no_prefix() == index.canonical_no_prefix())
            });
            if let Some(slot) = matched {
                *slot = None;
            }
        }

        for index in remaining.into_iter().flatten() {
            let canonical = index.canonical();
            changes.push(Change {
                kind: ChangeKind::AddIndex,
                table: table.to_string(),
                statement: format!("ALTER TABLE {table} ADD {canonical}"),
                report_key: format!("{table} {canonical}"),
                report_message: format!("Added index {table} {canonical}"),
            });
        }

        changes
    }

    fn diff_column(
        &self,
        table: &str,
        desired: &ColumnDef,
        live: &ColumnDef,
        changes: &mut ChangeSet,
    ) {
        if self.type_differs(&desired.type_token, &live.type_token) {
            changes.push(Change {
                kind: ChangeKind::ChangeColumn,
                table: table.to_string(),
                statement: format!(
                    "ALTER TABLE {table} CHANGE COLUMN `{}` {}",
                    live.name, desired.raw_clause
                ),
                report_key: format!("{table}.{}", live.name),
                report_message: format!(
                    "Changed type of {table}.{} from {} to {}",
                    live.name, live.type_token, desired.type_token
                ),
            });
        }

        if let Some(default) = &desired.default_literal {
            if defaults_differ(default, live.default_literal.as_deref()) {
                changes.push(Change {
                    kind: ChangeKind::SetDefault,
                    table: table.to_string(),
                    statement: format!(
                        "ALTER TABLE {table} ALTER COLUMN `{}` SET DEFAULT '{}'",
                        live.name,
                        default.replace('\'', "''")
                    ),
                    report_key: format!("{table}.{}", live.name),
                    report_message: format!(
                        "Changed default value of {table}.{} from {} to {default}",
                        live.name,
                        live.default_literal.as_deref().unwrap_or("NULL")
                    ),
                });
            }
        }
    }

    /// Returns true if changing `live` to `desired` is a real type change.
    fn type_differs(&self, desired: &str, live: &str) -> bool {
        let desired = desired.to_lowercase();
        let live = live.to_lowercase();
        if desired == live {
            return false;
        }

        if is_capacity_downgrade(&desired, &live) {
            return false;
        }

        if self.options.ignore_integer_display_width
            && is_integer(&desired)
            && is_integer(&live)
            && DISPLAY_WIDTH.replace_all(&desired, "") == DISPLAY_WIDTH.replace_all(&live, "")
        {
            return false;
        }

        true
    }
}

/// Returns true if both types are in the same text or blob family and
/// `desired` is the smaller one.
#[must_use]
pub fn is_capacity_downgrade(desired: &str, live: &str) -> bool {
    let desired = base_type(desired);
    let live = base_type(live);

    [TEXT_FIELDS, BLOB_FIELDS].iter().any(|family| {
        match (
            family.iter().position(|t| *t == desired),
            family.iter().position(|t| *t == live),
        ) {
            (Some(d), Some(l)) => d < l,
            _ => false,
        }
    })
}

fn is_integer(type_token: &str) -> bool {
    INT_FIELDS.contains(&base_type(type_token).as_str())
}

/// `varchar(255)` -> `varchar`, `bigint unsigned` -> `bigint`.
fn base_type(type_token: &str) -> String {
    type_token
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Compares a declared default with the live one. A missing live default
/// never matches; numeric values compare by value.
fn defaults_differ(desired: &str, live: Option<&str>) -> bool {
    let Some(live) = live else {
        return true;
    };
    if desired == live {
        return false;
    }

    if NUMERIC.is_match(desired) && NUMERIC.is_match(live) {
        if let (Ok(d), Ok(l)) = (desired.parse::<f64>(), live.parse::<f64>()) {
            return d != l;
        }
    }

    true
}
