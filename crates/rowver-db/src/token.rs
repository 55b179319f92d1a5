//! Version token generation.
//!
//! Tokens come from a single counter row that is bumped inside the caller's
//! read-write transaction. Because native_db serializes write transactions,
//! the counter only ever moves forward and every token it issues is new to
//! the whole database, which is stronger than the per-row "differs from the
//! previous value" guarantee writers rely on.

use crate::error::Result;
use crate::models::{StoredTokenClock, TOKEN_CLOCK_ID};
use native_db::transaction::RwTransaction;
use rowver_core::VersionToken;
use tracing::trace;

/// Issue the next token within `rw`.
///
/// The bump commits or rolls back together with the row write it guards.
pub(crate) fn next_token(rw: &RwTransaction<'_>) -> Result<VersionToken> {
    let last = rw
        .get()
        .primary::<StoredTokenClock>(TOKEN_CLOCK_ID.to_string())?
        .map(|clock| clock.last)
        .unwrap_or(0);
    let next = last.wrapping_add(1);
    rw.upsert(StoredTokenClock::new(next))?;

    let token = encode(next);
    trace!(counter = next, %token, "issued version token");
    Ok(token)
}

fn encode(counter: u64) -> VersionToken {
    VersionToken::from_bytes(counter.to_be_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_big_endian() {
        assert_eq!(encode(1).as_bytes(), &[0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(encode(2001).to_base64(), "AAAAAAAAB9E=");
    }

    #[test]
    fn test_encode_distinct() {
        assert_ne!(encode(1), encode(2));
    }
}
