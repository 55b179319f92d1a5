//! Many writers, one token
//!
//! Every contender saves against the same observed token from its own
//! thread. The store serializes their transactions; the first one in moves
//! the token on and every later one is refused. No lock is taken here.

use crate::conflict::attempt_save_changes;
use crate::error::{Result, SaveError};
use rowver_core::{ChangeSet, RecordId, VersionedRecord};
use rowver_db::Store;
use std::thread;
use tracing::info;

/// Fewest contenders a race makes sense with
pub const MIN_CONTENDERS: usize = 2;
/// Upper bound on spawned contenders
pub const MAX_CONTENDERS: usize = 16;

/// Contender count derived from the number of logical CPUs
///
/// Uses the `num_cpus` crate, clamped to `[MIN_CONTENDERS, MAX_CONTENDERS]`.
pub fn default_contenders() -> usize {
    num_cpus::get().clamp(MIN_CONTENDERS, MAX_CONTENDERS)
}

/// What happened when contenders raced one token
#[derive(Debug, Clone)]
pub struct RaceReport {
    pub contenders: usize,
    pub applied: usize,
    pub conflicts: usize,
    /// Index of the contender whose save applied
    pub winner: Option<usize>,
    /// The row after every contender finished
    pub final_record: VersionedRecord,
}

/// Race `contenders` threads saving row `id` with the token it holds now
///
/// Contender `i` writes `stock = i`, so the final row names the winner.
pub fn contend(store: &Store, id: RecordId, contenders: usize) -> Result<RaceReport> {
    let start = store
        .read_versioned(id)?
        .ok_or(rowver_db::Error::NotFound(id))?;
    let observed = start.token;

    let results: Vec<std::result::Result<_, SaveError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..contenders)
            .map(|i| {
                scope.spawn(move || {
                    let changes = ChangeSet::new().set_stock(i as i64);
                    attempt_save_changes(store, id, &changes, observed)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut applied = 0;
    let mut conflicts = 0;
    let mut winner = None;
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(_) => {
                applied += 1;
                winner = Some(i);
            }
            Err(SaveError::Conflict(_)) => conflicts += 1,
            Err(other) => return Err(other.into()),
        }
    }

    let final_record = store
        .read_versioned(id)?
        .ok_or(rowver_db::Error::NotFound(id))?;
    info!(%id, contenders, applied, conflicts, "race finished");

    Ok(RaceReport {
        contenders,
        applied,
        conflicts,
        winner,
        final_record,
    })
}
