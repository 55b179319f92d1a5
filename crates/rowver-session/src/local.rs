//! Caller-side record copies with dirty tracking
//!
//! A `LocalCopy` is what a caller edits between loading a row and saving it.
//! Every setter flips a dirty bit for its field; reading never does. When the
//! copy is saved only the dirty fields travel to the store, so a bare record
//! keeps any column the caller never touched, even if someone else changed it
//! in the meantime.

use crate::conflict::{attempt_save, save_record};
use crate::error::{Error, Result, SaveError};
use rowver_core::{
    ChangeSet, Field, FieldSet, Fields, Observable, Price, Record, RecordId, RecordKind, VersionToken,
    VersionedRecord,
};
use rowver_db::Store;

/// A record kind the store can load, write directly and save from a copy
pub trait Persisted: Observable + Clone + Sized {
    /// Mutable access for [`LocalCopy`] setters
    fn fields_mut(&mut self) -> &mut Fields;

    /// Read the current row
    fn read(store: &Store, id: RecordId) -> rowver_db::Result<Option<Self>>;

    /// Write without any token check, the way an out-of-band writer would
    fn write_direct(store: &Store, id: RecordId, changes: &ChangeSet) -> rowver_db::Result<Self>;

    /// Save the dirty fields of `copy` through this kind's save path
    fn save(store: &Store, copy: &LocalCopy<Self>) -> std::result::Result<Self, SaveError>;
}

impl Persisted for Record {
    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn read(store: &Store, id: RecordId) -> rowver_db::Result<Option<Self>> {
        store.read_record(id)
    }

    fn write_direct(store: &Store, id: RecordId, changes: &ChangeSet) -> rowver_db::Result<Self> {
        store.write_record(id, changes)
    }

    fn save(store: &Store, copy: &LocalCopy<Self>) -> std::result::Result<Self, SaveError> {
        save_record(store, copy)
    }
}

impl Persisted for VersionedRecord {
    fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    fn read(store: &Store, id: RecordId) -> rowver_db::Result<Option<Self>> {
        store.read_versioned(id)
    }

    fn write_direct(store: &Store, id: RecordId, changes: &ChangeSet) -> rowver_db::Result<Self> {
        store.write_versioned(id, changes)
    }

    fn save(store: &Store, copy: &LocalCopy<Self>) -> std::result::Result<Self, SaveError> {
        attempt_save(store, copy).map(|applied| applied.record)
    }
}

/// A caller's private, disposable copy of one row
#[derive(Debug, Clone)]
pub struct LocalCopy<R> {
    record: R,
    dirty: FieldSet,
}

impl<R: Persisted> LocalCopy<R> {
    /// Load the row with `id` into a fresh, clean copy
    pub fn load(store: &Store, id: RecordId) -> Result<Self> {
        let record = R::read(store, id)?.ok_or(Error::Db(rowver_db::Error::NotFound(id)))?;
        Ok(Self::from_record(record))
    }

    /// Wrap an already loaded record as a clean copy
    pub fn from_record(record: R) -> Self {
        Self {
            record,
            dirty: FieldSet::empty(),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.record.fields_mut().name = name.into();
        self.dirty.insert(Field::Name);
    }

    pub fn set_stock(&mut self, stock: i64) {
        self.record.fields_mut().stock = stock;
        self.dirty.insert(Field::Stock);
    }

    pub fn set_price(&mut self, price: Price) {
        self.record.fields_mut().price = price;
        self.dirty.insert(Field::Price);
    }

    /// Assign every field of `changes` through the setters
    pub fn apply(&mut self, changes: &ChangeSet) {
        let mut fields = self.record.fields().clone();
        changes.apply_to(&mut fields);
        for field in changes.fields().iter() {
            match field {
                Field::Name => self.set_name(fields.name.clone()),
                Field::Stock => self.set_stock(fields.stock),
                Field::Price => self.set_price(fields.price),
            }
        }
    }

    /// The record as the caller currently sees it
    pub fn record(&self) -> &R {
        &self.record
    }

    /// Fields assigned since load
    pub fn dirty(&self) -> FieldSet {
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// The write this copy would send: dirty fields with their local values
    pub fn changes(&self) -> ChangeSet {
        ChangeSet::from_dirty(self.record.fields(), self.dirty)
    }

    pub fn into_record(self) -> R {
        self.record
    }
}

impl LocalCopy<VersionedRecord> {
    /// The token the row carried when this copy was loaded
    pub fn observed_token(&self) -> VersionToken {
        self.record.token
    }
}

impl<R: Observable> Observable for LocalCopy<R> {
    fn id(&self) -> RecordId {
        self.record.id()
    }

    fn kind(&self) -> RecordKind {
        self.record.kind()
    }

    fn fields(&self) -> &Fields {
        self.record.fields()
    }

    fn token(&self) -> Option<VersionToken> {
        self.record.token()
    }
}
