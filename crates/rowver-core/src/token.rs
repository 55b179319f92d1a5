//! Opaque row version token

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque 8-byte version stamp attached to a versioned row
///
/// The store replaces a row's token on every successful write, so two reads
/// of an unmodified row see equal tokens and any intervening write makes them
/// differ. Tokens carry no meaning beyond equality: no ordering, no
/// arithmetic.
///
/// Across the caller boundary a token travels as standard base64 (always 12
/// characters), which is also what `Display` prints.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionToken([u8; 8]);

impl VersionToken {
    /// Size of a token in bytes
    pub const LEN: usize = 8;

    /// Wrap raw token bytes
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Get the raw token bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Render as base64 for display or transport
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Decode a token previously rendered with [`VersionToken::to_base64`]
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidToken(format!("{}: {}", encoded, e)))?;
        let bytes: [u8; 8] = bytes.try_into().map_err(|b: Vec<u8>| {
            Error::InvalidToken(format!("expected {} bytes, got {}", Self::LEN, b.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionToken({})", self.to_base64())
    }
}
