//! Column and index extraction from `CREATE TABLE` text.
//!
//! Extraction is line oriented: the declared schema must put one column or
//! index definition per line, comma terminated, the way the platform's
//! schema files are written. This is a precondition on the input, not a
//! general SQL parser. Everything here produces the [`TableSchema`] model
//! and nothing downstream depends on how it was parsed.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::index::parse_index_clause;
use crate::schema::{ColumnDef, TableSchema};

static DEFAULT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\sDEFAULT\s+'").expect("Invalid default keyword regex"));

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Za-z$_\-\x{80}-\x{10FFFF}]+$").expect("Invalid identifier regex")
});

/// Leading tokens that introduce an index definition.
const INDEX_KEYWORDS: &[&str] = &["primary", "index", "fulltext", "unique", "key", "spatial"];

/// Leading tokens that introduce constraints which are not reconciled.
const CONSTRAINT_KEYWORDS: &[&str] = &["constraint", "foreign", "check"];

/// Why a clause could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparseableReason {
    /// The statement has no parenthesized body.
    MissingBody,
    /// An index line did not match the index clause shape.
    MalformedIndex,
    /// A constraint line (foreign key, check) that is never reconciled.
    UnsupportedConstraint,
    /// The leading token is not a valid column name.
    InvalidColumnName,
    /// A column line without a type.
    MissingType,
}

/// A clause that was dropped from a declared table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unparseable {
    /// Table the clause belongs to.
    pub table: String,
    /// The clause text (trimmed).
    pub clause: String,
    /// Why it was dropped.
    pub reason: UnparseableReason,
}

/// The result of extracting one declared table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    /// The declared columns and indexes.
    pub schema: TableSchema,
    /// Clauses that could not be used.
    pub unparseable: Vec<Unparseable>,
}

/// Extracts the columns and indexes of one `CREATE TABLE` statement.
///
/// # Example
///
/// ```
/// use oxide_delta::extract::parse_create_table;
///
/// let parsed = parse_create_table(
///     "wp_terms",
///     "CREATE TABLE wp_terms (
///  term_id bigint(20) unsigned NOT NULL auto_increment,
///  slug varchar(200) NOT NULL default '',
///  PRIMARY KEY  (term_id),
///  KEY slug (slug(191))
/// ) ENGINE=InnoDB",
/// );
///
/// assert_eq!(parsed.schema.columns.len(), 2);
/// assert_eq!(parsed.schema.columns[0].type_token, "bigint(20) unsigned");
/// assert_eq!(parsed.schema.indexes[1].canonical(), "KEY `slug` (`slug`(191))");
/// ```
#[must_use]
pub fn parse_create_table(table: &str, sql: &str) -> ParsedTable {
    let mut schema = TableSchema::new(table);
    let mut unparseable = Vec::new();

    let Some(body) = table_body(sql) else {
        unparseable.push(Unparseable {
            table: table.to_string(),
            clause: sql.trim().to_string(),
            reason: UnparseableReason::MissingBody,
        });
        return ParsedTable {
            schema,
            unparseable,
        };
    };

    for clause in field_clauses(body) {
        let mut reject = |reason| {
            unparseable.push(Unparseable {
                table: table.to_string(),
                clause: clause.to_string(),
                reason,
            });
        };

        let (token, quoted) = leading_token(clause);
        let keyword = token.to_lowercase();

        if !quoted && INDEX_KEYWORDS.contains(&keyword.as_str()) {
            match parse_index_clause(clause) {
                Some(index) => schema.indexes.push(index),
                None => reject(UnparseableReason::MalformedIndex),
            }
        } else if !quoted && CONSTRAINT_KEYWORDS.contains(&keyword.as_str()) {
            reject(UnparseableReason::UnsupportedConstraint);
        } else if !IDENTIFIER.is_match(token) && !(quoted && !token.is_empty()) {
            reject(UnparseableReason::InvalidColumnName);
        } else {
            match parse_column_clause(clause) {
                Some(column) => schema.columns.push(column),
                None => reject(UnparseableReason::MissingType),
            }
        }
    }

    ParsedTable {
        schema,
        unparseable,
    }
}

/// Parses a single column definition line, e.g. `` `age` int(11) DEFAULT '0'``.
///
/// Returns `None` when the clause has no type after the column name.
#[must_use]
pub fn parse_column_clause(clause: &str) -> Option<ColumnDef> {
    let clause = clause.trim().trim_end_matches(',').trim_end();
    let (name, _) = leading_token(clause);
    if name.is_empty() {
        return None;
    }

    let rest = clause[name_span(clause)..].trim_start();
    let type_token = type_token(rest)?;

    let column = ColumnDef::new(name, clause, type_token);
    Some(match default_literal(clause) {
        Some(value) => column.default_literal(value),
        None => column,
    })
}

/// Returns the text between the first `(` and its matching `)`.
///
/// Quoted strings and identifiers are skipped, so a `)` inside a default
/// value or comment does not end the body early.
#[must_use]
pub fn table_body(sql: &str) -> Option<&str> {
    let start = sql.find('(')?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in sql[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' && q != '`' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&sql[start + 1..start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Splits a table body into trimmed, non-blank field clauses.
#[must_use]
pub fn field_clauses(body: &str) -> Vec<&str> {
    body.lines()
        .map(|line| line.trim().trim_end_matches(',').trim_end())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Extracts the literal from the first `DEFAULT '<value>'` fragment that
/// is not itself inside a quoted string (such as a `COMMENT`).
///
/// Doubled quotes are unescaped. Function or bare-word defaults
/// (`DEFAULT CURRENT_TIMESTAMP`, `DEFAULT 0`) are not literals and yield
/// `None`.
#[must_use]
pub fn default_literal(clause: &str) -> Option<String> {
    let start = DEFAULT_KEYWORD
        .find_iter(clause)
        .find(|m| !inside_quotes(clause, m.start()))?
        .end();
    let mut value = String::new();
    let mut chars = clause[start..].chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            } else {
                return Some(value);
            }
        }
        value.push(ch);
    }

    None
}

/// Returns true if byte offset `pos` falls inside a quoted string or
/// identifier.
fn inside_quotes(clause: &str, pos: usize) -> bool {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in clause.char_indices() {
        if offset >= pos {
            break;
        }
        match quote {
            Some(_) if escaped => escaped = false,
            Some(q) if ch == '\\' && q != '`' => escaped = true,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if matches!(ch, '\'' | '"' | '`') => quote = Some(ch),
            None => {}
        }
    }

    quote.is_some()
}

/// Reads the type of a column from the text following its name.
///
/// The type is the first token, where parentheses may contain spaces
/// (`decimal(10, 2)` becomes `decimal(10,2)`), followed by ` unsigned` when
/// present.
#[must_use]
pub fn type_token(rest: &str) -> Option<String> {
    let mut token = String::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut end = rest.len();

    for (offset, ch) in rest.char_indices() {
        if quoted {
            token.push(ch);
            if ch == '\'' {
                quoted = false;
            }
            continue;
        }
        match ch {
            '\'' if depth > 0 => {
                quoted = true;
                token.push(ch);
            }
            '(' => {
                depth += 1;
                token.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                token.push(ch);
            }
            c if c.is_whitespace() || c == ',' && depth == 0 => {
                if depth == 0 {
                    end = offset;
                    break;
                }
            }
            c => token.push(c),
        }
    }

    if token.is_empty() {
        return None;
    }

    let mut words = rest[end..].split_whitespace();
    if let Some(word) = words.next() {
        if word.eq_ignore_ascii_case("unsigned") {
            token.push(' ');
            token.push_str(word);
        }
    }

    Some(token)
}

/// Returns the leading token of a clause with backticks stripped, and
/// whether it was quoted.
fn leading_token(clause: &str) -> (&str, bool) {
    if let Some(rest) = clause.strip_prefix('`') {
        return match rest.find('`') {
            Some(end) => (&rest[..end], true),
            None => (rest, true),
        };
    }
    let end = clause.find(char::is_whitespace).unwrap_or(clause.len());
    (&clause[..end], false)
}

/// Byte length of the leading token including its backticks.
fn name_span(clause: &str) -> usize {
    if let Some(rest) = clause.strip_prefix('`') {
        return rest.find('`').map_or(clause.len(), |end| end + 2);
    }
    clause.find(char::is_whitespace).unwrap_or(clause.len())
}
