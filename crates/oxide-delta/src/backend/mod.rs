//! SQL execution backends.
//!
//! The engine never talks to a database directly. It issues statements
//! through [`Backend`], which the host application provides; [`MySqlBackend`]
//! is the sqlx-based implementation used by the CLI.

mod mysql;

pub use mysql::MySqlBackend;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One result row: column name to value, in the order the server returned
/// the columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: IndexMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column value.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a column value, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Gets a raw column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Gets a column as text. `NULL` and missing columns yield `None`;
    /// numbers and booleans are rendered as text.
    #[must_use]
    pub fn get_str(&self, column: &str) -> Option<String> {
        self.get(column).and_then(value_to_string)
    }

    /// Gets a column as an integer, parsing text values if needed.
    #[must_use]
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Gets the first column of the row.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.values.values().next()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Renders a scalar value as text; `NULL`, arrays and objects yield `None`.
#[must_use]
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

/// SQL execution backend consumed by the engine.
///
/// Statements are awaited one at a time; implementations do not need to
/// support concurrent calls.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Executes a statement and returns the number of affected rows.
    async fn query(&self, sql: &str) -> Result<u64>;

    /// Runs a statement and returns all result rows.
    async fn get_results(&self, sql: &str) -> Result<Vec<Row>>;

    /// Returns the first column of every result row as text.
    async fn get_col(&self, sql: &str) -> Result<Vec<String>> {
        let rows = self.get_results(sql).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.first().and_then(value_to_string))
            .collect())
    }

    /// Returns the first column of the first result row as text.
    async fn get_var(&self, sql: &str) -> Result<Option<String>> {
        let rows = self.get_results(sql).await?;
        Ok(rows
            .first()
            .and_then(|row| row.first())
            .and_then(value_to_string))
    }

    /// Enables or disables error reporting and returns the previous setting.
    ///
    /// Suppression only affects how failures are reported by the backend;
    /// failing calls still return an error.
    fn suppress_errors(&self, suppress: bool) -> bool;
}
