//! Rowver DB - Record store using native_db
//!
//! Provides persistent storage for:
//! - Bare records (no concurrency metadata)
//! - Versioned records and their store-assigned version tokens
//! - The token clock that hands out fresh tokens
//!
//! Every write runs inside a single native_db read-write transaction. Those
//! transactions are serialized by the engine, which is what makes
//! [`Store::write_versioned_if`] an atomic compare-and-write without any
//! application-side locking.

mod error;
mod models;
mod queries;
mod store;
mod token;

pub use error::{Error, Result};
pub use store::{Store, WriteOutcome};
