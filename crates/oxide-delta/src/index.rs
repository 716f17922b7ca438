//! Index clause normalization.
//!
//! Turns a raw index line from a `CREATE TABLE` body into an [`IndexDef`]
//! whose canonical forms are directly comparable with indexes read back
//! from `SHOW INDEX`.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{IndexColumn, IndexDef, IndexKind};

static INDEX_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^
        (?P<kind>PRIMARY\s+KEY|(?:UNIQUE|FULLTEXT|SPATIAL)\s+(?:KEY|INDEX)|KEY|INDEX)
        \s*
        (?:`(?P<quoted>[^`]+)`|(?P<bare>[^\s`(]+))?
        \s*
        \((?P<columns>.+)\)
        (?:\s+.*)?$",
    )
    .expect("Invalid index clause regex")
});

static INDEX_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)^\s*
        `?(?P<name>[^`\s(]+)`?
        \s*
        (?:\(\s*(?P<sub_part>\d+)\s*\))?
        \s*
        (?:ASC|DESC)?
        \s*$",
    )
    .expect("Invalid index column regex")
});

/// Normalizes an index type token: upper case, single spaces, `INDEX` → `KEY`.
///
/// # Example
///
/// ```
/// use oxide_delta::index::normalize_kind;
/// use oxide_delta::schema::IndexKind;
///
/// assert_eq!(normalize_kind("unique   index"), Some(IndexKind::Unique));
/// assert_eq!(normalize_kind("INDEX"), Some(IndexKind::Key));
/// ```
#[must_use]
pub fn normalize_kind(raw: &str) -> Option<IndexKind> {
    let token = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
        .replace("INDEX", "KEY");
    IndexKind::from_sql(&token)
}

/// Parses one index clause, e.g. ``UNIQUE KEY `slug` (`slug`(20),`taxonomy`)``.
///
/// Returns `None` when the clause does not have the shape
/// `<type> [<name>] (<columns>)`. A non-primary index declared without a
/// name is named after its first column, as MySQL does.
#[must_use]
pub fn parse_index_clause(clause: &str) -> Option<IndexDef> {
    let caps = INDEX_CLAUSE.captures(clause.trim())?;

    let kind = normalize_kind(caps.name("kind")?.as_str())?;

    let mut columns = Vec::new();
    for entry in caps.name("columns")?.as_str().split(',') {
        columns.push(parse_index_column(entry)?);
    }
    if columns.is_empty() {
        return None;
    }

    let name = caps
        .name("quoted")
        .or_else(|| caps.name("bare"))
        .map_or_else(|| columns[0].name.clone(), |m| m.as_str().to_string());

    Some(IndexDef::new(kind, &name, columns))
}

fn parse_index_column(entry: &str) -> Option<IndexColumn> {
    let caps = INDEX_COLUMN.captures(entry)?;
    let name = caps.name("name")?.as_str();

    match caps.name("sub_part") {
        Some(sub_part) => {
            let length = sub_part.as_str().parse().ok()?;
            Some(IndexColumn::prefixed(name, length))
        }
        None => Some(IndexColumn::new(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unique_with_sub_part() {
        let index = parse_index_clause("UNIQUE KEY `slug` (`slug`(20),`taxonomy`)").unwrap();

        assert_eq!(index.kind(), IndexKind::Unique);
        assert_eq!(index.name(), "slug");
        assert_eq!(
            index.columns(),
            &[IndexColumn::prefixed("slug", 20), IndexColumn::new("taxonomy")]
        );
        assert_eq!(index.canonical(), "UNIQUE KEY `slug` (`slug`(20),`taxonomy`)");
        assert_eq!(index.canonical_no_prefix(), "UNIQUE KEY `slug` (`slug`,`taxonomy`)");
    }

    #[test]
    fn test_parse_primary_key() {
        let index = parse_index_clause("PRIMARY KEY  (ID)").unwrap();

        assert_eq!(index.kind(), IndexKind::Primary);
        assert_eq!(index.name(), "");
        assert_eq!(index.canonical(), "PRIMARY KEY (`ID`)");
    }

    #[test]
    fn test_index_keyword_becomes_key() {
        let index = parse_index_clause("index Type_Status_Date (post_type,post_status,post_date,ID)")
            .unwrap();

        assert_eq!(index.kind(), IndexKind::Key);
        assert_eq!(
            index.canonical(),
            "KEY `type_status_date` (`post_type`,`post_status`,`post_date`,`ID`)"
        );
    }

    #[test]
    fn test_fulltext_and_spatial() {
        let fulltext = parse_index_clause("FULLTEXT INDEX body (post_content)").unwrap();
        assert_eq!(fulltext.canonical(), "FULLTEXT KEY `body` (`post_content`)");

        let spatial = parse_index_clause("SPATIAL KEY  `geo`  ( `location` )").unwrap();
        assert_eq!(spatial.canonical(), "SPATIAL KEY `geo` (`location`)");
    }

    #[test]
    fn test_unnamed_index_takes_first_column_name() {
        let index = parse_index_clause("KEY (meta_key(191), post_id)").unwrap();

        assert_eq!(index.name(), "meta_key");
        assert_eq!(index.canonical(), "KEY `meta_key` (`meta_key`(191),`post_id`)");
    }

    #[test]
    fn test_trailing_options_and_order_are_ignored() {
        let index = parse_index_clause("KEY `date` (`post_date` DESC) USING BTREE").unwrap();
        assert_eq!(index.canonical(), "KEY `date` (`post_date`)");
    }

    #[test]
    fn test_rejects_malformed_clauses() {
        assert!(parse_index_clause("").is_none());
        assert!(parse_index_clause("KEY").is_none());
        assert!(parse_index_clause("UNIQUE (slug)").is_none());
        assert!(parse_index_clause("KEY `k` (`a` `b`)").is_none());
    }
}
