//! Statement classification.
//!
//! Sorts a batch of declared SQL into table creation, database creation and
//! data statements so they can be ordered and reconciled.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::scope::SchemaScope;

static CREATE_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(`[^`]+`|[^\s(;]+)")
        .expect("Invalid CREATE TABLE regex")
});

static CREATE_DATABASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+DATABASE\s+(?:IF\s+NOT\s+EXISTS\s+)?(`[^`]+`|[^\s;]+)")
        .expect("Invalid CREATE DATABASE regex")
});

static INSERT_INTO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*INSERT\s+(?:IGNORE\s+)?INTO\s+(`[^`]+`|[^\s(;]+)")
        .expect("Invalid INSERT INTO regex")
});

static UPDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*UPDATE\s+(`[^`]+`|[^\s;]+)").expect("Invalid UPDATE regex")
});

/// Declared SQL handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Queries {
    /// One string of `;`-separated statements.
    Batch(String),
    /// Individual statements.
    List(Vec<String>),
    /// A scope sentinel, resolved through a
    /// [`SchemaSource`](crate::scope::SchemaSource).
    Scope(SchemaScope),
}

impl From<&str> for Queries {
    fn from(sql: &str) -> Self {
        Self::Batch(sql.to_string())
    }
}

impl From<String> for Queries {
    fn from(sql: String) -> Self {
        Self::Batch(sql)
    }
}

impl From<Vec<String>> for Queries {
    fn from(statements: Vec<String>) -> Self {
        Self::List(statements)
    }
}

impl From<Vec<&str>> for Queries {
    fn from(statements: Vec<&str>) -> Self {
        Self::List(statements.into_iter().map(String::from).collect())
    }
}

impl From<SchemaScope> for Queries {
    fn from(scope: SchemaScope) -> Self {
        Self::Scope(scope)
    }
}

/// What a single statement is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `CREATE TABLE <name>`.
    CreateTable(String),
    /// `CREATE DATABASE <name>`.
    CreateDatabase(String),
    /// `INSERT INTO <name>`.
    Insert(String),
    /// `UPDATE <name>`.
    Update(String),
}

/// A batch split by statement kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedBatch {
    /// `CREATE DATABASE` statements, run first.
    pub databases: Vec<String>,
    /// `CREATE TABLE` statements by table name, in first-declaration order.
    pub tables: IndexMap<String, String>,
    /// `INSERT` and `UPDATE` statements, run last.
    pub inserts: Vec<String>,
    /// Statements matching none of the above.
    pub unclassified: Vec<String>,
}

impl ClassifiedBatch {
    /// Returns true if the batch holds no statements at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
            && self.tables.is_empty()
            && self.inserts.is_empty()
            && self.unclassified.is_empty()
    }
}

/// Splits a `;`-separated batch, dropping empty fragments.
///
/// Splitting is textual: a `;` inside a string literal splits too.
#[must_use]
pub fn split_batch(sql: &str) -> Vec<String> {
    sql.split(';')
        .filter(|fragment| !fragment.trim().is_empty())
        .map(String::from)
        .collect()
}

/// Skips leading `--` and `#` line comments and `/* */` blocks.
///
/// An unterminated comment swallows the rest of the text.
#[must_use]
pub fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if rest.starts_with("--") || rest.starts_with('#') {
            rest = rest.find('\n').map_or("", |end| &rest[end + 1..]);
        } else if let Some(body) = rest.strip_prefix("/*") {
            rest = body.find("*/").map_or("", |end| &body[end + 2..]);
        } else {
            return rest;
        }
        rest = rest.trim_start();
    }
}

/// Identifies a statement by its leading keywords, after any leading
/// comments.
#[must_use]
pub fn classify_statement(sql: &str) -> Option<StatementKind> {
    let sql = strip_leading_comments(sql);
    if let Some(table) = target_name(&CREATE_TABLE, sql) {
        return Some(StatementKind::CreateTable(table));
    }
    if let Some(database) = target_name(&CREATE_DATABASE, sql) {
        return Some(StatementKind::CreateDatabase(database));
    }
    if let Some(table) = target_name(&INSERT_INTO, sql) {
        return Some(StatementKind::Insert(table));
    }
    target_name(&UPDATE, sql).map(StatementKind::Update)
}

fn target_name(re: &Regex, sql: &str) -> Option<String> {
    re.captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('`').to_string())
}

/// Classifies statements. Statements are kept verbatim, comments included;
/// statements holding nothing but comments are dropped.
///
/// A later `CREATE TABLE` for an already seen name replaces the earlier
/// statement but keeps its position.
pub fn classify<I, S>(statements: I) -> ClassifiedBatch
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut batch = ClassifiedBatch::default();

    for statement in statements {
        let statement = statement.into();
        if strip_leading_comments(&statement).is_empty() {
            continue;
        }

        match classify_statement(&statement) {
            Some(StatementKind::CreateTable(table)) => {
                batch.tables.insert(table, statement);
            }
            Some(StatementKind::CreateDatabase(_)) => batch.databases.push(statement),
            Some(StatementKind::Insert(_) | StatementKind::Update(_)) => {
                batch.inserts.push(statement);
            }
            None => batch.unclassified.push(statement),
        }
    }

    batch
}
