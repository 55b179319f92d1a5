//! Error types for rowver-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid version token: {0}")]
    InvalidToken(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
