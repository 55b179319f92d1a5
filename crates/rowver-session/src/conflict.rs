//! Conflict detection for token-guarded saves
//!
//! A save hands the store the fields the caller changed plus the token the
//! caller observed at load. The store compares and writes in one atomic step;
//! this module turns its answer into something a caller can branch on.
//!
//! # Outcomes
//!
//! - **Applied**: the token still matched. The row now carries a new token,
//!   returned in [`Applied`] so the caller can keep working with it.
//! - **Conflict**: another writer got there first. Nothing was written and
//!   [`ConflictDetected`] says who expected what, what the row holds now and
//!   which fields the caller tried to write.
//! - **Not found**: the row is gone.
//!
//! # No Retry
//!
//! Re-sending the same change set with the same stale token would fail again,
//! and re-sending it with the new token would silently throw away the other
//! writer's work. Neither is done here. The caller picks a policy (reload and
//! discard, overwrite, or merge), obtains a fresh token with [`reload`] and
//! saves again.

use crate::error::SaveError;
use crate::local::LocalCopy;
use rowver_core::{ChangeSet, FieldSet, Record, RecordId, VersionToken, VersionedRecord};
use rowver_db::{Store, WriteOutcome};
use std::fmt;
use tracing::{info, warn};

/// A save that went through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub record_id: RecordId,
    /// Token the row carries after the save
    pub token: VersionToken,
    /// The row as committed
    pub record: VersionedRecord,
}

/// A save refused because the row's token moved on
///
/// `current` is read inside the same transaction that refused the write, so
/// it is exactly the state that beat the caller. A caller reconciling against
/// it must still [`reload`] (or use `current.token`) before saving again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictDetected {
    pub record_id: RecordId,
    /// Token the caller loaded and sent
    pub expected: VersionToken,
    /// Token the row carries now
    pub actual: VersionToken,
    /// Persisted values at the time of the refusal
    pub current: VersionedRecord,
    /// Fields the refused save tried to write
    pub attempted: FieldSet,
}

impl fmt::Display for ConflictDetected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Version conflict on {}: expected token {}, found {} (attempted {})",
            self.record_id, self.expected, self.actual, self.attempted
        )
    }
}

/// Every way a versioned save can end, as a single tagged value
///
/// Store failures are not outcomes; they stay errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Applied(Applied),
    ConflictDetected(Box<ConflictDetected>),
    NotFound(RecordId),
}

impl SaveOutcome {
    /// Fold a save result into an outcome, keeping only store failures as errors
    pub fn classify(
        result: std::result::Result<Applied, SaveError>,
    ) -> std::result::Result<Self, rowver_db::Error> {
        match result {
            Ok(applied) => Ok(SaveOutcome::Applied(applied)),
            Err(SaveError::Conflict(conflict)) => Ok(SaveOutcome::ConflictDetected(conflict)),
            Err(SaveError::NotFound(id)) => Ok(SaveOutcome::NotFound(id)),
            Err(SaveError::Store(err)) => Err(err),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, SaveOutcome::Applied(_))
    }
}

/// Save the dirty fields of `copy`, guarded by the token it was loaded with
pub fn attempt_save(
    store: &Store,
    copy: &LocalCopy<VersionedRecord>,
) -> std::result::Result<Applied, SaveError> {
    attempt_save_changes(store, copy.record().id, &copy.changes(), copy.observed_token())
}

/// Write `changes` to row `id` only if it still carries `observed`
pub fn attempt_save_changes(
    store: &Store,
    id: RecordId,
    changes: &ChangeSet,
    observed: VersionToken,
) -> std::result::Result<Applied, SaveError> {
    match store.write_versioned_if(id, changes, observed)? {
        WriteOutcome::Applied(record) => {
            info!(%id, previous = %observed, token = %record.token, "save applied");
            Ok(Applied {
                record_id: id,
                token: record.token,
                record,
            })
        }
        WriteOutcome::Mismatch { current } => {
            let conflict = ConflictDetected {
                record_id: id,
                expected: observed,
                actual: current.token,
                current,
                attempted: changes.fields(),
            };
            warn!(%id, expected = %conflict.expected, actual = %conflict.actual, "save conflict");
            Err(SaveError::conflict_detected(conflict))
        }
        WriteOutcome::Missing => Err(SaveError::NotFound(id)),
    }
}

/// [`attempt_save`] folded into a single [`SaveOutcome`]
pub fn save_outcome(
    store: &Store,
    copy: &LocalCopy<VersionedRecord>,
) -> std::result::Result<SaveOutcome, rowver_db::Error> {
    SaveOutcome::classify(attempt_save(store, copy))
}

/// Save the dirty fields of a bare record copy
///
/// There is no token to compare, so this never reports a conflict. Fields
/// the copy did not touch keep whatever the row holds at write time.
pub fn save_record(store: &Store, copy: &LocalCopy<Record>) -> std::result::Result<Record, SaveError> {
    let id = copy.record().id;
    let changes = copy.changes();
    let record = store.write_record(id, &changes)?;
    info!(%id, fields = %changes.fields(), "bare save applied");
    Ok(record)
}

/// Load a fresh copy of the conflicting row, carrying its current token
///
/// The returned copy is clean: whatever the caller wants to reapply must be
/// set on it again, which is the point where a resolution policy lives.
pub fn reload(
    store: &Store,
    conflict: &ConflictDetected,
) -> std::result::Result<LocalCopy<VersionedRecord>, SaveError> {
    let id = conflict.record_id;
    let record = store.read_versioned(id)?.ok_or(SaveError::NotFound(id))?;
    Ok(LocalCopy::from_record(record))
}
