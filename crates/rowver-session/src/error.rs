//! Error types for rowver-session
//!
//! `SaveError` wraps `ConflictDetected` from `conflict.rs`, while `conflict.rs`
//! returns `SaveError`. Both live in the same crate and only meet in function
//! signatures, so the back-and-forth import is harmless.

use crate::conflict::ConflictDetected;
use crate::scenario::ScenarioState;
use rowver_core::RecordId;
use thiserror::Error;

/// Result type for rowver-session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a save did not apply
///
/// A conflict is the protocol doing its job, not a fault. It is still
/// reported through `Err` so it can not be ignored by accident.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The row's token no longer matches the one the caller loaded
    ///
    /// Boxed to keep the error small when propagated with `?`. Use
    /// [`SaveError::conflict()`] for convenient access.
    #[error("{0}")]
    Conflict(Box<ConflictDetected>),

    /// The row does not exist
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// The store could not complete the request
    #[error("store unavailable: {0}")]
    Store(rowver_db::Error),
}

impl SaveError {
    /// Create a Conflict error
    pub fn conflict_detected(conflict: ConflictDetected) -> Self {
        SaveError::Conflict(Box::new(conflict))
    }

    /// Get the conflict details if this is a Conflict error
    pub fn conflict(&self) -> Option<&ConflictDetected> {
        match self {
            SaveError::Conflict(conflict) => Some(conflict),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SaveError::Conflict(_))
    }
}

impl From<rowver_db::Error> for SaveError {
    fn from(err: rowver_db::Error) -> Self {
        match err {
            rowver_db::Error::NotFound(id) => SaveError::NotFound(id),
            other => SaveError::Store(other),
        }
    }
}

/// Errors that can occur in rowver-session
#[derive(Debug, Error)]
pub enum Error {
    /// A save failed for a reason other than a handled conflict
    #[error(transparent)]
    Save(#[from] SaveError),

    /// Store error
    #[error(transparent)]
    Db(#[from] rowver_db::Error),

    /// A workflow step was called out of order
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: ScenarioState,
        action: &'static str,
    },

    /// Configuration could not be read or parsed
    #[error("config error: {0}")]
    Config(String),
}

// Compile-time check that the errors are Send + Sync for thread-safe propagation.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
    _assert_error_send_sync::<SaveError>();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_save_error() {
        let err: SaveError = rowver_db::Error::NotFound(RecordId(4)).into();
        assert!(matches!(err, SaveError::NotFound(RecordId(4))));
        assert!(!err.is_conflict());
        assert!(err.conflict().is_none());
    }

    #[test]
    fn test_database_error_is_store_unavailable() {
        let err: SaveError = rowver_db::Error::Database("disk gone".into()).into();
        assert!(matches!(err, SaveError::Store(_)));
        assert_eq!(err.to_string(), "store unavailable: Database error: disk gone");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidTransition {
            from: ScenarioState::Loaded,
            action: "save",
        };
        assert_eq!(err.to_string(), "cannot save while loaded");
    }
}
