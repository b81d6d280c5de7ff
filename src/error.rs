// src/error.rs

//! Error types for rq
//!
//! Expected outcomes (a duplicate package, a package whose tools failed
//! during a batch load) are reported as values by the ingestion and
//! reconciliation layers. This type covers the failures that abort an
//! operation.

use thiserror::Error;

/// Errors returned by the rq library
#[derive(Error, Debug)]
pub enum Error {
    /// Wrong file type, missing directory, bad argument
    #[error("{0}")]
    ValidationError(String),

    /// External tool failed, timed out, or produced unusable output
    #[error("Tool invocation failed: {0}")]
    ToolError(String),

    /// Entity with the same unique key already exists
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Lookup did not match anything
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Text could not be parsed into the expected shape
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Configuration file missing or malformed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// SQLite failure
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Filesystem or process I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error is a unique-constraint violation reported by SQLite
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::DatabaseError(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}
