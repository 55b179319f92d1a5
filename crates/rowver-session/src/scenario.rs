//! Workflow - The demonstrated load / modify / interfere / save sequence
//!
//! ```text
//! Loaded ──modify──▶ LocallyModified ──external_write──▶ ExternallyWritten
//!                          │                                   │
//!                          └───────────────save────────────────┤
//!                                                              ▼
//!                                            SaveAttempted ─▶ Applied
//!                                                           └▶ ConflictDetected
//! ```
//!
//! Each step takes a snapshot, so a finished workflow carries the evidence of
//! what every writer saw and did. For a bare record the save always applies
//! and only the fields the local caller touched are overwritten. For a
//! versioned record the save applies only if nothing else wrote the row since
//! it was loaded.

use crate::config::ScenarioConfig;
use crate::conflict::ConflictDetected;
use crate::error::{Error, Result, SaveError};
use crate::local::{LocalCopy, Persisted};
use crate::snapshot::{FieldDiff, SnapshotLog, Stage};
use chrono::{DateTime, Utc};
use rowver_core::{ChangeSet, Fields, Record, RecordId, RecordKind, VersionToken, VersionedRecord};
use rowver_db::Store;
use std::fmt;
use tracing::{debug, info};

/// Where a workflow stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioState {
    Loaded,
    LocallyModified,
    ExternallyWritten,
    SaveAttempted,
    Applied,
    ConflictDetected,
}

impl ScenarioState {
    /// Whether the workflow has reached an outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScenarioState::Applied | ScenarioState::ConflictDetected)
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioState::Loaded => "loaded",
            ScenarioState::LocallyModified => "locally modified",
            ScenarioState::ExternallyWritten => "externally written",
            ScenarioState::SaveAttempted => "save attempted",
            ScenarioState::Applied => "applied",
            ScenarioState::ConflictDetected => "conflict detected",
        };
        f.write_str(name)
    }
}

/// How a workflow ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioOutcome {
    Applied,
    ConflictDetected(Box<ConflictDetected>),
}

impl ScenarioOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ScenarioOutcome::Applied)
    }

    pub fn conflict(&self) -> Option<&ConflictDetected> {
        match self {
            ScenarioOutcome::ConflictDetected(conflict) => Some(conflict),
            ScenarioOutcome::Applied => None,
        }
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioOutcome::Applied => f.write_str("applied"),
            ScenarioOutcome::ConflictDetected(conflict) => write!(f, "{}", conflict),
        }
    }
}

/// Everything a finished workflow has to show
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub kind: RecordKind,
    pub outcome: ScenarioOutcome,
    pub snapshots: SnapshotLog,
    /// Row content after the workflow
    pub final_fields: Fields,
    /// Row token after the workflow, for versioned records
    pub final_token: Option<VersionToken>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScenarioReport {
    /// Diff between each pair of consecutive snapshots
    pub fn diffs(&self) -> Vec<(Stage, Stage, Vec<FieldDiff>)> {
        self.snapshots.diffs()
    }
}

/// One caller's pass over one row
///
/// The store handle is borrowed, never owned, so several workflows can share
/// a store and run against the same row.
pub struct Workflow<'s, R> {
    store: &'s Store,
    state: ScenarioState,
    local: LocalCopy<R>,
    outcome: Option<ScenarioOutcome>,
    log: SnapshotLog,
    started_at: DateTime<Utc>,
}

impl<'s, R: Persisted> Workflow<'s, R> {
    /// Load row `id` and enter [`ScenarioState::Loaded`]
    pub fn load(store: &'s Store, id: RecordId) -> Result<Self> {
        let started_at = Utc::now();
        let local = LocalCopy::<R>::load(store, id)?;
        let mut log = SnapshotLog::new();
        log.record(Stage::InitialLoad, &local);
        debug!(%id, kind = %local.record().kind(), "workflow loaded");

        Ok(Self {
            store,
            state: ScenarioState::Loaded,
            local,
            outcome: None,
            log,
            started_at,
        })
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn local(&self) -> &LocalCopy<R> {
        &self.local
    }

    pub fn snapshots(&self) -> &SnapshotLog {
        &self.log
    }

    /// Reassign fields on the private copy; the store is not touched
    pub fn modify(&mut self, changes: &ChangeSet) -> Result<()> {
        self.expect_state(&[ScenarioState::Loaded, ScenarioState::LocallyModified], "modify")?;
        self.local.apply(changes);
        self.state = ScenarioState::LocallyModified;
        self.log.record(Stage::AfterLocalMutation, &self.local);
        Ok(())
    }

    /// Let an independent writer store `changes` directly, bypassing the copy
    pub fn external_write(&mut self, changes: &ChangeSet) -> Result<()> {
        self.expect_state(&[ScenarioState::LocallyModified], "write externally")?;
        let id = self.local.record().id();
        let written = R::write_direct(self.store, id, changes)?;
        self.state = ScenarioState::ExternallyWritten;
        self.log.record(Stage::AfterExternalWrite, &written);
        debug!(%id, fields = %changes.fields(), "external write");
        Ok(())
    }

    /// Save the copy's dirty fields through the record kind's save path
    ///
    /// A conflict ends the workflow in [`ScenarioState::ConflictDetected`]
    /// and is returned as an outcome. Any other failure is an error.
    pub fn save(&mut self) -> Result<&ScenarioOutcome> {
        self.expect_state(
            &[ScenarioState::LocallyModified, ScenarioState::ExternallyWritten],
            "save",
        )?;
        self.state = ScenarioState::SaveAttempted;
        let id = self.local.record().id();

        let outcome = match R::save(self.store, &self.local) {
            Ok(saved) => {
                self.state = ScenarioState::Applied;
                self.log.record(Stage::AfterSaveAttempt, &saved);
                ScenarioOutcome::Applied
            }
            Err(SaveError::Conflict(conflict)) => {
                self.state = ScenarioState::ConflictDetected;
                self.log.record(Stage::AfterSaveAttempt, &conflict.current);
                ScenarioOutcome::ConflictDetected(conflict)
            }
            Err(other) => return Err(other.into()),
        };
        debug!(%id, state = %self.state, "save attempted");

        let outcome = self.outcome.insert(outcome);
        Ok(&*outcome)
    }

    /// Re-read the row, take the final snapshot and produce the report
    pub fn finish(mut self, name: impl Into<String>) -> Result<ScenarioReport> {
        let Some(outcome) = self.outcome.take() else {
            return Err(Error::InvalidTransition {
                from: self.state,
                action: "finish",
            });
        };
        let id = self.local.record().id();
        let row = R::read(self.store, id)?.ok_or(rowver_db::Error::NotFound(id))?;
        self.log.record(Stage::Final, &row);

        let report = ScenarioReport {
            name: name.into(),
            kind: row.kind(),
            outcome,
            snapshots: self.log,
            final_fields: row.fields().clone(),
            final_token: row.token(),
            started_at: self.started_at,
            finished_at: Utc::now(),
        };
        info!(name = %report.name, kind = %report.kind, outcome = %report.outcome, "scenario finished");
        Ok(report)
    }

    fn expect_state(&self, allowed: &[ScenarioState], action: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }
}

/// Reset the bare rows to the seed and run the scenario against them
pub fn run_bare(store: &Store, config: &ScenarioConfig) -> Result<ScenarioReport> {
    store.reset_records(config.seed.record_id(), &config.seed.fields())?;
    run_workflow::<Record>(store, config)
}

/// Reset the versioned rows to the seed and run the scenario against them
pub fn run_versioned(store: &Store, config: &ScenarioConfig) -> Result<ScenarioReport> {
    store.reset_versioned(config.seed.record_id(), &config.seed.fields())?;
    run_workflow::<VersionedRecord>(store, config)
}

/// Run a scenario on the record kind it names
pub fn run(store: &Store, config: &ScenarioConfig) -> Result<ScenarioReport> {
    match config.kind {
        RecordKind::Bare => run_bare(store, config),
        RecordKind::Versioned => run_versioned(store, config),
    }
}

fn run_workflow<R: Persisted>(store: &Store, config: &ScenarioConfig) -> Result<ScenarioReport> {
    let mut workflow = Workflow::<R>::load(store, config.seed.record_id())?;
    workflow.modify(&config.local)?;
    if !config.external.is_empty() {
        workflow.external_write(&config.external)?;
    }
    workflow.save()?;
    workflow.finish(config.name.clone())
}
