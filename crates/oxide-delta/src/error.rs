//! Error types for schema reconciliation.

use std::path::PathBuf;

use crate::scope::SchemaScope;

/// Errors that can occur while reconciling a schema.
///
/// Most problems with the declared schema are not errors: unrecognized
/// statements and malformed clauses are reported in the
/// [`DeltaReport`](crate::executor::DeltaReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    /// Database error from the MySQL driver.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error raised by a non-sqlx backend.
    #[error("Backend error: {0}")]
    Backend(String),

    /// IO error (reading schema files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A scope sentinel was given but no schema source is configured.
    #[error("No schema source configured to resolve scope '{0}'")]
    MissingSchemaSource(SchemaScope),

    /// A schema source had no file for the requested scope.
    #[error("Schema file not found: {0}")]
    SchemaFileNotFound(PathBuf),
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, DeltaError>;
