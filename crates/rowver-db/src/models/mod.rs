//! Database models for persistent storage.

mod clock;
mod record;

pub use clock::*;
pub use record::*;
