//! Declarative MySQL schema reconciliation for Rust.
//!
//! `oxide-delta` compares a declared schema (a set of `CREATE TABLE`
//! statements) with the live schema of a MySQL database and computes the
//! statements that bring the database up to date without losing data:
//! - Missing tables are created from the declared statement, verbatim
//! - Missing columns and indexes are added
//! - Column types and literal defaults are changed when they differ
//! - Nothing is ever dropped, and text/blob columns are never shrunk
//!
//! # Architecture
//!
//! - **Classifier** - Splits a batch into table, database and data statements
//! - **Extractor** - Reads columns and indexes out of `CREATE TABLE` text
//! - **Index normalizer** - Canonical renderings used to match indexes
//! - **Introspector** - Reads the live schema with `DESCRIBE`/`SHOW INDEX`
//! - **Differ** - Compares desired and live tables
//! - **Executor** - Orders, optionally runs and reports the statements
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_delta::prelude::*;
//!
//! let backend = MySqlBackend::connect("mysql://root@localhost/blog").await?;
//! let delta = DbDelta::new(backend).with_policy(
//!     StaticPolicy::new()
//!         .with_global_tables(["wp_users", "wp_usermeta"])
//!         .upgrade_global_tables(false),
//! );
//!
//! let report = delta
//!     .run(
//!         "CREATE TABLE wp_posts (
//!  ID bigint(20) unsigned NOT NULL auto_increment,
//!  post_title text NOT NULL,
//!  PRIMARY KEY  (ID)
//! )",
//!         true,
//!     )
//!     .await?;
//!
//! for message in report.messages() {
//!     println!("{message}");
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show what would change
//! oxide-delta plan --schema schema/blog.sql
//!
//! # Apply a scope from a schema directory
//! oxide-delta apply --scope all --schema-dir schema
//!
//! # Show the live structure of a table
//! oxide-delta inspect wp_posts
//! ```

pub mod backend;
pub mod classifier;
pub mod differ;
pub mod error;
pub mod executor;
pub mod extract;
pub mod index;
pub mod introspect;
pub mod policy;
pub mod schema;
pub mod scope;

pub use error::{DeltaError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::backend::{Backend, MySqlBackend, Row};
    pub use crate::classifier::Queries;
    pub use crate::differ::{Change, ChangeKind, ChangeSet, Differ, DifferOptions};
    pub use crate::error::{DeltaError, Result};
    pub use crate::executor::{DbDelta, DeltaPlan, DeltaReport, OutcomeStatus, StatementOutcome};
    pub use crate::extract::{Unparseable, UnparseableReason};
    pub use crate::introspect::{Introspector, ServerInfo};
    pub use crate::policy::{GlobalTablePolicy, NoGlobalTables, StaticPolicy};
    pub use crate::schema::{ColumnDef, IndexColumn, IndexDef, IndexKind, TableSchema};
    pub use crate::scope::{SchemaDir, SchemaScope, SchemaSource};
}
