//! Error types for database operations.

use rowver_core::RecordId;
use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Native DB error. The store could not complete the operation.
    #[error("Database error: {0}")]
    Database(String),

    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// Duplicate key.
    #[error("Duplicate key: {0}")]
    DuplicateKey(RecordId),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure came from the storage engine rather than the request
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_))
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}
