//! Token clock model.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Primary key of the single token clock row.
pub const TOKEN_CLOCK_ID: &str = "rowversion";

/// Stored token clock.
///
/// Holds the last value handed out as a version token. It is never reset, so
/// a reseeded row can not be given a token some earlier row already had.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredTokenClock {
    /// Always "rowversion" - single row.
    #[primary_key]
    pub id: String,
    /// Last issued counter value.
    pub last: u64,
}

impl StoredTokenClock {
    pub fn new(last: u64) -> Self {
        Self {
            id: TOKEN_CLOCK_ID.to_string(),
            last,
        }
    }
}
