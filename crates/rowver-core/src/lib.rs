//! Rowver Core - Record types for optimistic concurrency control
//!
//! This crate provides the plain data types shared by the store and the
//! session layer:
//! - Record identity (`RecordId`)
//! - Field values (`Field`, `FieldValue`, fixed-point `Price`)
//! - Bare and versioned records (`Record`, `VersionedRecord`)
//! - The opaque row version (`VersionToken`)
//! - Partial writes (`ChangeSet`) and dirty-field sets (`FieldSet`)
//!
//! ## Two Record Kinds
//!
//! A [`Record`] has no concurrency metadata: whoever writes a field last wins
//! that field. A [`VersionedRecord`] carries a [`VersionToken`] that the store
//! replaces on every write, so a writer holding a stale token can be refused.
//!
//! Nothing in this crate can mint a fresh token from scratch; tokens come out
//! of the store, or are decoded from the base64 form a caller was handed.

mod change_set;
mod error;
mod identity;
mod record;
mod token;
mod value;

pub use change_set::{ChangeSet, FieldChange, FieldSet};
pub use error::{Error, Result};
pub use identity::{RecordId, RecordKind};
pub use record::{Fields, Observable, Record, VersionedRecord};
pub use token::VersionToken;
pub use value::{Field, FieldValue, Price};
