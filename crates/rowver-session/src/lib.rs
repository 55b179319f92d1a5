//! Rowver Session - Optimistic saves over a rowver store
//!
//! This crate is the caller side of the version-token protocol: it loads a
//! private copy of a row, tracks which fields the caller reassigns, and saves
//! exactly those fields back, guarded by the token observed at load.
//!
//! ## Flow
//!
//! ```text
//! Store ──load──▶ LocalCopy (token T0, dirty = {})
//!                   │ set_name / set_price
//!                   ▼
//!                 LocalCopy (token T0, dirty = {name, price})
//!                   │ attempt_save
//!                   ▼
//! Store::write_versioned_if(id, changes, T0)
//!   ├─ token still T0 ─▶ Applied { token: T1 }
//!   └─ token moved on  ─▶ SaveError::Conflict(ConflictDetected)
//! ```
//!
//! ## Key Components
//!
//! - [`LocalCopy`]: In-memory record copy with per-field dirty bits
//! - [`attempt_save`]: Token-guarded save returning [`Applied`] or a conflict
//! - [`Snapshot`] / [`SnapshotLog`]: Captured record state with field diffs
//! - [`Workflow`]: The load → modify → external write → save state machine
//! - [`contend`]: Many threads racing the same token, for the at-most-one rule
//!
//! A conflict is never retried here. Deciding whether to reload, overwrite or
//! merge belongs to the caller, who must re-read the row before saving again.

pub mod config;
pub mod conflict;
mod error;
mod local;
pub mod race;
pub mod scenario;
pub mod snapshot;

pub use config::{DemoConfig, ScenarioConfig, SeedConfig};
pub use conflict::{
    attempt_save, attempt_save_changes, reload, save_outcome, save_record, Applied, ConflictDetected,
    SaveOutcome,
};
pub use error::{Error, Result, SaveError};
pub use local::{LocalCopy, Persisted};
pub use race::{contend, default_contenders, RaceReport};
pub use scenario::{
    run, run_bare, run_versioned, ScenarioOutcome, ScenarioReport, ScenarioState, Workflow,
};
pub use snapshot::{Column, FieldDiff, Snapshot, SnapshotLog, Stage};
