//! Snapshot - Immutable captures of a record's observable state
//!
//! Snapshots are evidence, not state: they copy what a record looked like at
//! one stage of a workflow so the stages can be compared afterwards. They
//! never feed back into what gets written.
//!
//! # Example
//!
//! ```rust,ignore
//! use rowver_session::{SnapshotLog, Stage};
//!
//! let mut log = SnapshotLog::new();
//! log.record(Stage::InitialLoad, &copy);
//! copy.set_stock(1000);
//! log.record(Stage::AfterLocalMutation, &copy);
//!
//! for (from, to, diffs) in log.diffs() {
//!     println!("{} -> {}: {} change(s)", from, to, diffs.len());
//! }
//! ```

use indexmap::IndexMap;
use rowver_core::{Field, FieldValue, Observable, RecordId, RecordKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point in a workflow at which a snapshot is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    InitialLoad,
    AfterLocalMutation,
    AfterExternalWrite,
    AfterSaveAttempt,
    Final,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::InitialLoad => "initial load",
            Stage::AfterLocalMutation => "after local mutation",
            Stage::AfterExternalWrite => "after external write",
            Stage::AfterSaveAttempt => "after save attempt",
            Stage::Final => "final",
        };
        f.write_str(name)
    }
}

/// A column that can differ between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Field(Field),
    Token,
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Field(field) => write!(f, "{}", field),
            Column::Token => f.write_str("token"),
        }
    }
}

/// One column that changed between two snapshots
///
/// Values are rendered for display; `None` means the column was absent
/// (a token on one side of a bare/versioned comparison).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub column: Column,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.column,
            self.old.as_deref().unwrap_or("-"),
            self.new.as_deref().unwrap_or("-")
        )
    }
}

/// An immutable capture of a record at one stage
///
/// The token, when present, is kept in its base64 display form since the raw
/// bytes mean nothing to a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    stage: Stage,
    /// Position within its workflow, starting at 0
    step: u32,
    record_id: RecordId,
    kind: RecordKind,
    /// Field values in column order
    values: IndexMap<Field, FieldValue>,
    token: Option<String>,
}

impl Snapshot {
    /// Capture `record` as it is right now
    pub fn capture(stage: Stage, step: u32, record: &impl Observable) -> Self {
        let fields = record.fields();
        let values = Field::ALL
            .into_iter()
            .map(|field| (field, fields.get(field)))
            .collect();
        Self {
            stage,
            step,
            record_id: record.id(),
            kind: record.kind(),
            values,
            token: record.token().map(|t| t.to_base64()),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Get a captured field value
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Get the captured stock, if it is an integer
    pub fn stock(&self) -> Option<i64> {
        match self.values.get(&Field::Stock) {
            Some(FieldValue::Int(stock)) => Some(*stock),
            _ => None,
        }
    }

    /// The token in base64, for versioned records
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Iterate over captured field values in column order
    pub fn values(&self) -> impl Iterator<Item = (&Field, &FieldValue)> {
        self.values.iter()
    }

    /// Columns whose value differs from `self` to `other`, in column order
    ///
    /// The token is compared last. Stage and step are not compared.
    pub fn diff(&self, other: &Snapshot) -> Vec<FieldDiff> {
        let mut diffs: Vec<FieldDiff> = Field::ALL
            .into_iter()
            .filter_map(|field| {
                let old = self.values.get(&field);
                let new = other.values.get(&field);
                (old != new).then(|| FieldDiff {
                    column: Column::Field(field),
                    old: old.map(|v| v.to_string()),
                    new: new.map(|v| v.to_string()),
                })
            })
            .collect();

        if self.token != other.token {
            diffs.push(FieldDiff {
                column: Column::Token,
                old: self.token.clone(),
                new: other.token.clone(),
            });
        }
        diffs
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.step, self.stage, self.record_id)?;
        for (field, value) in &self.values {
            write!(f, " {}={}", field, value)?;
        }
        if let Some(token) = &self.token {
            write!(f, " token={}", token)?;
        }
        Ok(())
    }
}

/// Append-only sequence of snapshots for one workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLog {
    snapshots: Vec<Snapshot>,
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `record` at `stage` as the next step
    pub fn record(&mut self, stage: Stage, record: &impl Observable) -> &Snapshot {
        let step = self.snapshots.len() as u32;
        self.snapshots.push(Snapshot::capture(stage, step, record));
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// First snapshot taken at `stage`
    pub fn at(&self, stage: Stage) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.stage == stage)
    }

    pub fn first(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// Diff between each pair of consecutive snapshots
    pub fn diffs(&self) -> Vec<(Stage, Stage, Vec<FieldDiff>)> {
        self.snapshots
            .windows(2)
            .map(|pair| (pair[0].stage, pair[1].stage, pair[0].diff(&pair[1])))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowver_core::{Fields, Price, Record, VersionToken, VersionedRecord};

    fn bare(stock: i64) -> Record {
        Record::new(
            RecordId(1),
            Fields::new("Widget", stock, Price::from_cents(1000)),
        )
    }

    fn versioned(stock: i64, counter: u8) -> VersionedRecord {
        VersionedRecord::new(
            RecordId(1),
            Fields::new("Widget", stock, Price::from_cents(1000)),
            VersionToken::from_bytes([0, 0, 0, 0, 0, 0, 0, counter]),
        )
    }

    #[test]
    fn test_capture_values() {
        let snapshot = Snapshot::capture(Stage::InitialLoad, 0, &versioned(100, 1));

        assert_eq!(snapshot.stage(), Stage::InitialLoad);
        assert_eq!(snapshot.step(), 0);
        assert_eq!(snapshot.kind(), RecordKind::Versioned);
        assert_eq!(snapshot.stock(), Some(100));
        assert_eq!(snapshot.get(Field::Name), Some(&FieldValue::from("Widget")));
        assert_eq!(snapshot.token(), Some("AAAAAAAAAAE="));
        let fields: Vec<Field> = snapshot.values().map(|(f, _)| *f).collect();
        assert_eq!(fields, Field::ALL.to_vec());
    }

    #[test]
    fn test_capture_bare_has_no_token() {
        let snapshot = Snapshot::capture(Stage::InitialLoad, 0, &bare(100));
        assert_eq!(snapshot.kind(), RecordKind::Bare);
        assert_eq!(snapshot.token(), None);
    }

    #[test]
    fn test_snapshot_immutability() {
        let mut record = bare(100);
        let snapshot = Snapshot::capture(Stage::InitialLoad, 0, &record);

        record.fields.stock = 75;

        assert_eq!(snapshot.stock(), Some(100));
    }

    #[test]
    fn test_diff_equal_is_empty() {
        let a = Snapshot::capture(Stage::InitialLoad, 0, &bare(100));
        let b = Snapshot::capture(Stage::Final, 4, &bare(100));
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_diff_reports_field_and_token() {
        let a = Snapshot::capture(Stage::InitialLoad, 0, &versioned(100, 1));
        let b = Snapshot::capture(Stage::AfterExternalWrite, 1, &versioned(50, 2));

        let diffs = a.diff(&b);
        assert_eq!(diffs.len(), 2);
        assert_eq!(
            diffs[0],
            FieldDiff {
                column: Column::Field(Field::Stock),
                old: Some("100".to_string()),
                new: Some("50".to_string()),
            }
        );
        assert_eq!(diffs[1].column, Column::Token);
        assert_eq!(diffs[1].old.as_deref(), Some("AAAAAAAAAAE="));
        assert_eq!(diffs[1].new.as_deref(), Some("AAAAAAAAAAI="));
        assert_eq!(diffs[0].to_string(), "stock: 100 -> 50");
    }

    #[test]
    fn test_diff_bare_against_versioned() {
        let a = Snapshot::capture(Stage::InitialLoad, 0, &bare(100));
        let b = Snapshot::capture(Stage::InitialLoad, 0, &versioned(100, 1));

        let diffs = a.diff(&b);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].to_string(), "token: - -> AAAAAAAAAAE=");
    }

    #[test]
    fn test_log_assigns_steps_and_diffs() {
        let mut log = SnapshotLog::new();
        log.record(Stage::InitialLoad, &bare(100));
        log.record(Stage::AfterExternalWrite, &bare(75));
        let last = log.record(Stage::Final, &bare(75));
        assert_eq!(last.step(), 2);

        assert_eq!(log.len(), 3);
        assert_eq!(log.first().map(|s| s.stage()), Some(Stage::InitialLoad));
        assert_eq!(log.at(Stage::AfterExternalWrite).and_then(|s| s.stock()), Some(75));

        let diffs = log.diffs();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].0, Stage::InitialLoad);
        assert_eq!(diffs[0].1, Stage::AfterExternalWrite);
        assert_eq!(diffs[0].2.len(), 1);
        assert!(diffs[1].2.is_empty());
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = Snapshot::capture(Stage::InitialLoad, 0, &bare(100));
        assert_eq!(
            snapshot.to_string(),
            "[0] initial load record:1 name=\"Widget\" stock=100 price=10.00"
        );
    }

    #[test]
    fn test_snapshot_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Snapshot>();
    }
}
