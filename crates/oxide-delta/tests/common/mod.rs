#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex};

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use oxide_delta::backend::{Backend, Row};
use oxide_delta::classifier::{StatementKind, classify_statement, strip_leading_comments};
use oxide_delta::extract::{default_literal, parse_column_clause, parse_create_table};
use oxide_delta::index::parse_index_clause;
use oxide_delta::prelude::*;

static ALTER_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*ALTER\s+TABLE\s+`?([^`\s]+)`?\s+(.*)$").unwrap()
});

static ADD_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^ADD\s+COLUMN\s+(.*)$").unwrap());

static CHANGE_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^CHANGE\s+COLUMN\s+`?([^`\s]+)`?\s+(.*)$").unwrap());

static SET_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^ALTER\s+COLUMN\s+`?([^`\s]+)`?\s+SET\s+DEFAULT\s+'.*$").unwrap()
});

static ADD_INDEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)^ADD\s+(.*)$").unwrap());

static DESCRIBE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*DESCRIBE\s+`?([^`\s;]+)`?\s*;?\s*$").unwrap());

static SHOW_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*SHOW\s+INDEX\s+FROM\s+`?([^`\s;]+)`?\s*;?\s*$").unwrap()
});

/// An in-memory stand-in for a MySQL database.
///
/// It understands the statements the engine emits (`CREATE TABLE`,
/// `ALTER TABLE ... ADD COLUMN | CHANGE COLUMN | ALTER COLUMN ... SET
/// DEFAULT | ADD <index>`) and answers `DESCRIBE`, `SHOW INDEX FROM` and
/// `SELECT VERSION()` from the replayed state.
pub struct MemoryBackend {
    tables: Mutex<IndexMap<String, TableSchema>>,
    executed: Mutex<Vec<String>>,
    fail_on: Mutex<Vec<String>>,
    version: String,
    suppress: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_version("8.0.36")
    }

    pub fn with_version(version: &str) -> Self {
        Self {
            tables: Mutex::new(IndexMap::new()),
            executed: Mutex::new(Vec::new()),
            fail_on: Mutex::new(Vec::new()),
            version: version.to_string(),
            suppress: AtomicBool::new(false),
        }
    }

    /// Creates the tables of a `;`-separated batch without recording the
    /// statements as executed.
    pub fn seed(self, sql: &str) -> Self {
        for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
            self.apply(statement)
                .unwrap_or_else(|e| panic!("Failed to seed: {statement}\nError: {e}"));
        }
        self
    }

    /// Makes every statement containing `needle` fail.
    pub fn fail_on(self, needle: &str) -> Self {
        self.fail_on.lock().unwrap().push(needle.to_string());
        self
    }

    /// Statements received through [`Backend::query`], in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn table(&self, name: &str) -> Option<TableSchema> {
        self.tables.lock().unwrap().get(name).cloned()
    }

    pub fn is_suppressing(&self) -> bool {
        self.suppress.load(Ordering::SeqCst)
    }

    fn apply(&self, sql: &str) -> Result<u64> {
        match classify_statement(sql) {
            Some(StatementKind::CreateTable(name)) => {
                let mut tables = self.tables.lock().unwrap();
                if tables.contains_key(&name) {
                    return Err(error(format!("Table '{name}' already exists")));
                }
                let parsed = parse_create_table(&name, strip_leading_comments(sql));
                tables.insert(name, parsed.schema);
                Ok(0)
            }
            Some(StatementKind::CreateDatabase(_)) => Ok(1),
            Some(StatementKind::Insert(_) | StatementKind::Update(_)) => Ok(1),
            None => self.alter(sql),
        }
    }

    fn alter(&self, sql: &str) -> Result<u64> {
        let caps = ALTER_TABLE
            .captures(sql)
            .ok_or_else(|| error(format!("Unsupported statement: {sql}")))?;
        let name = &caps[1];
        let action = caps[2].trim();

        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .get_mut(name)
            .ok_or_else(|| error(format!("Table '{name}' doesn't exist")))?;

        if let Some(caps) = ADD_COLUMN.captures(action) {
            let column = parse_column_clause(&caps[1])
                .ok_or_else(|| error(format!("Bad column: {}", &caps[1])))?;
            if table.get_column(&column.name).is_some() {
                return Err(error(format!("Duplicate column name '{}'", column.name)));
            }
            table.columns.push(column);
        } else if let Some(caps) = CHANGE_COLUMN.captures(action) {
            let column = parse_column_clause(&caps[2])
                .ok_or_else(|| error(format!("Bad column: {}", &caps[2])))?;
            let slot = table
                .columns
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(&caps[1]))
                .ok_or_else(|| error(format!("Unknown column '{}'", &caps[1])))?;
            *slot = column;
        } else if let Some(caps) = SET_DEFAULT.captures(action) {
            let value = default_literal(action)
                .ok_or_else(|| error(format!("Bad default: {action}")))?;
            let slot = table
                .columns
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(&caps[1]))
                .ok_or_else(|| error(format!("Unknown column '{}'", &caps[1])))?;
            slot.default_literal = Some(value);
        } else if let Some(caps) = ADD_INDEX.captures(action) {
            let index = parse_index_clause(&caps[1])
                .ok_or_else(|| error(format!("Bad index: {}", &caps[1])))?;
            table.indexes.push(index);
        } else {
            return Err(error(format!("Unsupported ALTER: {action}")));
        }

        Ok(0)
    }

    fn describe(&self, name: &str) -> Result<Vec<Row>> {
        let tables = self.tables.lock().unwrap();
        let table = tables
            .get(name)
            .ok_or_else(|| error(format!("Table '{name}' doesn't exist")))?;

        Ok(table
            .columns
            .iter()
            .map(|column| {
                let clause = column.raw_clause.to_lowercase();
                let is_primary = table.indexes.iter().any(|i| {
                    i.kind() == IndexKind::Primary
                        && i.columns().iter().any(|c| c.name.eq_ignore_ascii_case(&column.name))
                });
                let null = if clause.contains("not null") || is_primary {
                    "NO"
                } else {
                    "YES"
                };
                let extra = if clause.contains("auto_increment") {
                    "auto_increment"
                } else {
                    ""
                };
                Row::new()
                    .with("Field", column.name.as_str())
                    .with("Type", column.type_token.as_str())
                    .with("Null", null)
                    .with("Key", if is_primary { "PRI" } else { "" })
                    .with(
                        "Default",
                        column
                            .default_literal
                            .as_deref()
                            .map_or(Value::Null, Value::from),
                    )
                    .with("Extra", extra)
            })
            .collect())
    }

    fn show_index(&self, name: &str) -> Result<Vec<Row>> {
        let tables = self.tables.lock().unwrap();
        let table = tables
            .get(name)
            .ok_or_else(|| error(format!("Table '{name}' doesn't exist")))?;

        let mut rows = Vec::new();
        for index in &table.indexes {
            let key_name = if index.kind() == IndexKind::Primary {
                "PRIMARY".to_string()
            } else {
                index.name().to_string()
            };
            let index_type = match index.kind() {
                IndexKind::Fulltext => "FULLTEXT",
                IndexKind::Spatial => "SPATIAL",
                _ => "BTREE",
            };
            for (seq, column) in index.columns().iter().enumerate() {
                rows.push(
                    Row::new()
                        .with("Table", name)
                        .with("Non_unique", i64::from(!index.is_unique()))
                        .with("Key_name", key_name.as_str())
                        .with("Seq_in_index", seq as i64 + 1)
                        .with("Column_name", column.name.as_str())
                        .with(
                            "Sub_part",
                            column.prefix_length.map_or(Value::Null, Value::from),
                        )
                        .with("Index_type", index_type),
                );
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn query(&self, sql: &str) -> Result<u64> {
        self.executed.lock().unwrap().push(sql.to_string());

        let failing = self
            .fail_on
            .lock()
            .unwrap()
            .iter()
            .any(|needle| sql.contains(needle.as_str()));
        if failing {
            return Err(error(format!("Simulated failure: {}", sql.trim())));
        }

        self.apply(sql)
    }

    async fn get_results(&self, sql: &str) -> Result<Vec<Row>> {
        if sql.trim_start().to_uppercase().starts_with("SELECT VERSION()") {
            return Ok(vec![Row::new().with("VERSION()", self.version.as_str())]);
        }
        if let Some(caps) = DESCRIBE.captures(sql) {
            return self.describe(&caps[1]);
        }
        if let Some(caps) = SHOW_INDEX.captures(sql) {
            return self.show_index(&caps[1]);
        }
        Err(error(format!("Unsupported query: {sql}")))
    }

    fn suppress_errors(&self, suppress: bool) -> bool {
        self.suppress.swap(suppress, Ordering::SeqCst)
    }
}

fn error(message: String) -> DeltaError {
    DeltaError::Backend(message)
}

/// The `wp_terms` and `wp_posts` tables as a platform declares them.
pub const BLOG_SCHEMA: &str = "CREATE TABLE wp_terms (
 term_id bigint(20) unsigned NOT NULL auto_increment,
 name varchar(200) NOT NULL default '',
 slug varchar(200) NOT NULL default '',
 term_group bigint(10) NOT NULL default 0,
 PRIMARY KEY  (term_id),
 KEY slug (slug(191)),
 KEY name (name(191))
) DEFAULT CHARACTER SET utf8mb4;
CREATE TABLE wp_posts (
 ID bigint(20) unsigned NOT NULL auto_increment,
 post_author bigint(20) unsigned NOT NULL default '0',
 post_date datetime NOT NULL default '0000-00-00 00:00:00',
 post_content longtext NOT NULL,
 post_title text NOT NULL,
 post_status varchar(20) NOT NULL default 'publish',
 post_name varchar(200) NOT NULL default '',
 menu_order int(11) NOT NULL default '0',
 PRIMARY KEY  (ID),
 KEY post_name (post_name(191)),
 KEY type_status_date (post_status,post_date,ID),
 KEY post_author (post_author)
) DEFAULT CHARACTER SET utf8mb4";
