//! Schema scope sentinels and the sources that resolve them.
//!
//! Callers may pass a scope (`all`, `blog`, `global`, `ms_global`) instead
//! of SQL text. The scope is turned into the declared schema by a
//! [`SchemaSource`] supplied by the host.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DeltaError, Result};

/// Which part of the declared schema to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaScope {
    /// Every table: global, per-site and multisite-global.
    All,
    /// Per-site tables only.
    Blog,
    /// Global tables, including the multisite-global ones.
    Global,
    /// Multisite-global tables only.
    MsGlobal,
}

impl SchemaScope {
    /// Returns the schema parts this scope covers, in order.
    #[must_use]
    pub fn parts(self) -> &'static [&'static str] {
        match self {
            Self::All => &["global", "blog", "ms_global"],
            Self::Blog => &["blog"],
            Self::Global => &["global", "ms_global"],
            Self::MsGlobal => &["ms_global"],
        }
    }

    /// Returns the sentinel name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Blog => "blog",
            Self::Global => "global",
            Self::MsGlobal => "ms_global",
        }
    }
}

impl fmt::Display for SchemaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "blog" => Ok(Self::Blog),
            "global" => Ok(Self::Global),
            "ms_global" => Ok(Self::MsGlobal),
            other => Err(format!("unknown schema scope '{other}'")),
        }
    }
}

/// Supplies declared schema text for a scope.
pub trait SchemaSource: Send + Sync {
    /// Returns the `;`-separated `CREATE TABLE` statements for `scope`.
    fn schema(&self, scope: SchemaScope) -> Result<String>;
}

/// Reads `<dir>/global.sql`, `<dir>/blog.sql` and `<dir>/ms_global.sql`.
///
/// Missing parts are skipped; a scope for which no file exists is an error.
#[derive(Debug, Clone)]
pub struct SchemaDir {
    dir: PathBuf,
}

impl SchemaDir {
    /// Creates a source reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SchemaSource for SchemaDir {
    fn schema(&self, scope: SchemaScope) -> Result<String> {
        let mut parts = Vec::new();
        for part in scope.parts() {
            let path = self.dir.join(format!("{part}.sql"));
            if path.is_file() {
                parts.push(std::fs::read_to_string(&path)?);
            }
        }

        if parts.is_empty() {
            let first = scope.parts()[0];
            return Err(DeltaError::SchemaFileNotFound(
                self.dir.join(format!("{first}.sql")),
            ));
        }

        Ok(parts.join(";\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope() {
        assert_eq!("all".parse::<SchemaScope>(), Ok(SchemaScope::All));
        assert_eq!("MS_GLOBAL".parse::<SchemaScope>(), Ok(SchemaScope::MsGlobal));
        assert!("site".parse::<SchemaScope>().is_err());
        assert_eq!(SchemaScope::Global.to_string(), "global");
    }

    #[test]
    fn test_schema_dir_combines_parts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("global.sql"), "CREATE TABLE wp_users (\n ID int\n)").unwrap();
        std::fs::write(dir.path().join("blog.sql"), "CREATE TABLE wp_posts (\n ID int\n)").unwrap();

        let source = SchemaDir::new(dir.path());

        let all = source.schema(SchemaScope::All).unwrap();
        assert!(all.contains("wp_users"));
        assert!(all.contains("wp_posts"));
        assert!(all.find("wp_users") < all.find("wp_posts"));

        let blog = source.schema(SchemaScope::Blog).unwrap();
        assert!(!blog.contains("wp_users"));
    }

    #[test]
    fn test_schema_dir_missing_scope() {
        let dir = tempfile::tempdir().unwrap();
        let source = SchemaDir::new(dir.path());

        let err = source.schema(SchemaScope::MsGlobal).unwrap_err();
        assert!(matches!(err, DeltaError::SchemaFileNotFound(path) if path.ends_with("ms_global.sql")));
    }
}
