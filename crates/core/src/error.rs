//! Error types for the migration system
//!
//! Every failure surfaces to the immediate caller; nothing is retried
//! automatically. An already-applied migration is not an error — see
//! [`crate::definitions::ApplyOutcome`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Error types for migration operations
#[derive(Error, Debug)]
pub enum MigrationError {
    /// A discovered file's name has no parsable leading order key
    #[error("invalid migration name '{name}': expected a leading integer order key")]
    InvalidName { name: String },

    /// An explicitly targeted migration file does not exist
    #[error("migration file not found: {0}")]
    NotFound(PathBuf),

    /// A revert was requested for a migration the ledger has no record of
    #[error("migration '{0}' has not been applied")]
    NotApplied(String),

    /// The ledger's unique constraint rejected a duplicate record, meaning a
    /// concurrent run applied the same migration first
    #[error("migration '{0}' was recorded by a concurrent run (ledger conflict)")]
    Conflict(String),

    /// The migration unit's own forward/backward operation failed; the
    /// surrounding transaction has been rolled back
    #[error("migration '{name}' failed: {message}")]
    Unit { name: String, message: String },

    /// Database connection, query, or transaction error
    #[error("database error: {0}")]
    Database(String),

    /// Filesystem error while reading or writing migration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        MigrationError::Database(err.to_string())
    }
}
