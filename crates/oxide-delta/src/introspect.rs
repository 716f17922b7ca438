//! Live schema introspection.
//!
//! Reads a table's columns (`DESCRIBE`) and indexes (`SHOW INDEX FROM`)
//! through the backend and reshapes them into the same [`TableSchema`]
//! model the extractor produces.

use indexmap::IndexMap;
use tracing::debug;

use crate::backend::{Backend, Row};
use crate::schema::{ColumnDef, IndexColumn, IndexDef, IndexKind, TableSchema};

/// Database server identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Version string as reported by `SELECT VERSION()`.
    pub version: String,
}

impl ServerInfo {
    /// Creates server info from a version string.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    /// Returns true for MariaDB servers.
    #[must_use]
    pub fn is_mariadb(&self) -> bool {
        self.version.to_lowercase().contains("mariadb")
    }

    /// Returns the leading `major.minor.patch` numbers.
    #[must_use]
    pub fn version_triple(&self) -> Option<(u32, u32, u32)> {
        let numeric: String = self
            .version
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let mut parts = numeric.split('.').map(str::parse::<u32>);
        let major = parts.next()?.ok()?;
        let minor = parts.next().and_then(Result::ok).unwrap_or(0);
        let patch = parts.next().and_then(Result::ok).unwrap_or(0);
        Some((major, minor, patch))
    }

    /// MySQL 8.0.17 and later no longer report integer display widths
    /// (`int(11)` is shown as `int`).
    #[must_use]
    pub fn ignores_integer_display_width(&self) -> bool {
        !self.is_mariadb() && self.version_triple().is_some_and(|v| v >= (8, 0, 17))
    }
}

/// Reads live table structure through a [`Backend`].
pub struct Introspector<'a, B: ?Sized> {
    backend: &'a B,
}

impl<'a, B: Backend + ?Sized> Introspector<'a, B> {
    /// Creates an introspector over `backend`.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Returns the live schema of `table`, or `None` if it does not exist.
    ///
    /// Backend errors are suppressed for the duration of the call and the
    /// previous suppression setting is restored afterwards. A failing
    /// `DESCRIBE` is how a missing table shows up, so it is not an error.
    pub async fn table(&self, table: &str) -> Option<TableSchema> {
        let previous = self.backend.suppress_errors(true);

        let columns = self
            .backend
            .get_results(&format!("DESCRIBE `{table}`;"))
            .await;
        let indexes = match &columns {
            Ok(rows) if !rows.is_empty() => self
                .backend
                .get_results(&format!("SHOW INDEX FROM `{table}`;"))
                .await
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        self.backend.suppress_errors(previous);

        let rows = match columns {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => return None,
            Err(e) => {
                debug!(table = %table, error = %e, "Table not found");
                return None;
            }
        };

        Some(TableSchema {
            name: table.to_string(),
            columns: columns_from_rows(&rows),
            indexes: indexes_from_rows(&indexes),
        })
    }

    /// Returns the server version, or `None` if it cannot be read.
    pub async fn server_info(&self) -> Option<ServerInfo> {
        let previous = self.backend.suppress_errors(true);
        let version = self.backend.get_var("SELECT VERSION();").await;
        self.backend.suppress_errors(previous);

        match version {
            Ok(Some(version)) => Some(ServerInfo::new(version)),
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Could not read server version");
                None
            }
        }
    }
}

/// Converts `DESCRIBE` rows into column definitions.
#[must_use]
pub fn columns_from_rows(rows: &[Row]) -> Vec<ColumnDef> {
    rows.iter()
        .filter_map(|row| {
            let name = row.get_str("Field")?;
            let type_token = row.get_str("Type").unwrap_or_default();
            let default = row.get_str("Default");

            let mut raw_clause = format!("`{name}` {type_token}");
            if row.get_str("Null").is_some_and(|n| n.eq_ignore_ascii_case("NO")) {
                raw_clause.push_str(" NOT NULL");
            }
            if let Some(ref value) = default {
                raw_clause.push_str(&format!(" DEFAULT '{}'", value.replace('\'', "''")));
            }
            if let Some(extra) = row.get_str("Extra").filter(|e| !e.is_empty()) {
                raw_clause.push(' ');
                raw_clause.push_str(&extra);
            }

            let column = ColumnDef::new(name, raw_clause, type_token);
            Some(match default {
                Some(value) => column.default_literal(value),
                None => column,
            })
        })
        .collect()
}

struct IndexRows {
    key_name: String,
    non_unique: bool,
    index_type: Option<String>,
    columns: Vec<(i64, IndexColumn)>,
}

/// Converts `SHOW INDEX` rows into index definitions.
///
/// Rows are grouped by key name in the order first seen; columns are
/// ordered by `Seq_in_index`. Expression parts (no `Column_name`) are
/// skipped.
#[must_use]
pub fn indexes_from_rows(rows: &[Row]) -> Vec<IndexDef> {
    let mut groups: IndexMap<String, IndexRows> = IndexMap::new();

    for (position, row) in rows.iter().enumerate() {
        let Some(key_name) = row.get_str("Key_name") else {
            continue;
        };
        let group = groups
            .entry(key_name.to_lowercase())
            .or_insert_with(|| IndexRows {
                key_name: key_name.clone(),
                non_unique: row.get_i64("Non_unique").unwrap_or(1) != 0,
                index_type: row.get_str("Index_type"),
                columns: Vec::new(),
            });

        let Some(column_name) = row.get_str("Column_name") else {
            continue;
        };
        let sequence = row
            .get_i64("Seq_in_index")
            .unwrap_or_else(|| i64::try_from(position).unwrap_or(i64::MAX));
        let sub_part = row
            .get_i64("Sub_part")
            .and_then(|len| u32::try_from(len).ok());
        let column = match sub_part {
            Some(len) => IndexColumn::prefixed(column_name, len),
            None => IndexColumn::new(column_name),
        };
        group.columns.push((sequence, column));
    }

    groups
        .into_values()
        .filter(|group| !group.columns.is_empty())
        .map(|mut group| {
            group.columns.sort_by_key(|(sequence, _)| *sequence);

            let mut kind = if group.key_name.eq_ignore_ascii_case("PRIMARY") {
                IndexKind::Primary
            } else if group.non_unique {
                IndexKind::Key
            } else {
                IndexKind::Unique
            };
            match group.index_type.as_deref().map(str::to_uppercase).as_deref() {
                Some("FULLTEXT") => kind = IndexKind::Fulltext,
                Some("SPATIAL") => kind = IndexKind::Spatial,
                _ => {}
            }

            let columns = group.columns.into_iter().map(|(_, c)| c).collect();
            let index = IndexDef::new(kind, &group.key_name, columns);
            match group.index_type {
                Some(algorithm) => index.algorithm(algorithm),
                None => index,
            }
        })
        .collect()
}
