//! Database store wrapper.

use crate::error::{Error, Result};
use crate::models::*;
use crate::token::next_token;
use native_db::transaction::RwTransaction;
use native_db::*;
use rowver_core::{ChangeSet, Fields, Record, RecordId, VersionToken, VersionedRecord};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models
        .define::<StoredRecord>()
        .expect("StoredRecord model definition is valid");
    models
        .define::<StoredVersionedRecord>()
        .expect("StoredVersionedRecord model definition is valid");
    models
        .define::<StoredTokenClock>()
        .expect("StoredTokenClock model definition is valid");
    models
});

/// Outcome of a token-guarded write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The stored token matched; changes were committed under a new token.
    Applied(VersionedRecord),
    /// The stored token differed from the expected one. Nothing was written;
    /// `current` is the row as it stood inside the failed transaction.
    Mismatch { current: VersionedRecord },
    /// No row with that ID exists.
    Missing,
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied(_))
    }
}

/// Database store holding bare and versioned records.
///
/// `Store` is a handle: pass it by reference to every operation, including
/// from several threads at once.
pub struct Store {
    pub(crate) db: Database<'static>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        info!(path = %path.as_ref().display(), "opened record store");
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    // ========================================================================
    // Bare records
    // ========================================================================

    /// Insert a new bare record.
    pub fn insert_record(&self, record: &Record) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        if rw
            .get()
            .primary::<StoredRecord>(record.id.raw())?
            .is_some()
        {
            return Err(Error::DuplicateKey(record.id));
        }
        rw.insert(StoredRecord::from_record(record))?;
        rw.commit()?;
        debug!(id = %record.id, "inserted bare record");
        Ok(())
    }

    /// Load a bare record by ID.
    pub fn read_record(&self, id: RecordId) -> Result<Option<Record>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredRecord> = r.get().primary(id.raw())?;
        Ok(stored.map(|s| s.to_record()))
    }

    /// Write `changes` to a bare record unconditionally.
    ///
    /// Only the fields named in `changes` are touched; every other column
    /// keeps what the row holds right now, including values another writer
    /// stored after the caller loaded its copy.
    pub fn write_record(&self, id: RecordId, changes: &ChangeSet) -> Result<Record> {
        let rw = self.db.rw_transaction()?;
        let mut stored: StoredRecord = rw.get().primary(id.raw())?.ok_or(Error::NotFound(id))?;
        if changes.is_empty() {
            return Ok(stored.to_record());
        }

        let mut fields = stored.fields();
        changes.apply_to(&mut fields);
        stored.set_fields(&fields);
        rw.upsert(stored.clone())?;
        rw.commit()?;

        debug!(%id, fields = %changes.fields(), "wrote bare record");
        Ok(stored.to_record())
    }

    // ========================================================================
    // Versioned records
    // ========================================================================

    /// Insert a new versioned record, assigning its first token.
    pub fn insert_versioned(&self, id: RecordId, fields: &Fields) -> Result<VersionedRecord> {
        let rw = self.db.rw_transaction()?;
        if rw
            .get()
            .primary::<StoredVersionedRecord>(id.raw())?
            .is_some()
        {
            return Err(Error::DuplicateKey(id));
        }
        let token = next_token(&rw)?;
        let stored = StoredVersionedRecord::new(id, fields, token);
        rw.insert(stored.clone())?;
        rw.commit()?;
        debug!(%id, %token, "inserted versioned record");
        Ok(stored.to_record())
    }

    /// Load a versioned record, with its current token, by ID.
    pub fn read_versioned(&self, id: RecordId) -> Result<Option<VersionedRecord>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredVersionedRecord> = r.get().primary(id.raw())?;
        Ok(stored.map(|s| s.to_record()))
    }

    /// Write `changes` to a versioned record without checking its token.
    ///
    /// This is the direct path an out-of-band writer takes. It still goes
    /// through the token clock, so anyone holding the old token will be
    /// refused by [`Store::write_versioned_if`] afterwards.
    pub fn write_versioned(&self, id: RecordId, changes: &ChangeSet) -> Result<VersionedRecord> {
        let rw = self.db.rw_transaction()?;
        let stored: StoredVersionedRecord =
            rw.get().primary(id.raw())?.ok_or(Error::NotFound(id))?;
        if changes.is_empty() {
            return Ok(stored.to_record());
        }

        let updated = Self::apply_versioned(&rw, &stored, changes)?;
        rw.commit()?;

        debug!(%id, fields = %changes.fields(), token = %updated.token, "wrote versioned record");
        Ok(updated)
    }

    /// Write `changes` only if the row still carries `expected`.
    ///
    /// Compare and write happen in one read-write transaction. If the tokens
    /// differ the transaction is dropped uncommitted and the row is left
    /// exactly as another writer left it. Two calls racing with the same
    /// `expected` token can not both see [`WriteOutcome::Applied`]: the
    /// second one to get the write lock reads the token the first one wrote.
    ///
    /// An empty change set still performs the comparison, but a match writes
    /// nothing and keeps the current token.
    pub fn write_versioned_if(
        &self,
        id: RecordId,
        changes: &ChangeSet,
        expected: VersionToken,
    ) -> Result<WriteOutcome> {
        let rw = self.db.rw_transaction()?;
        let Some(stored) = rw.get().primary::<StoredVersionedRecord>(id.raw())? else {
            debug!(%id, "conditional write on missing record");
            return Ok(WriteOutcome::Missing);
        };

        let current = stored.token();
        if current != expected {
            debug!(%id, %expected, actual = %current, "version token mismatch");
            return Ok(WriteOutcome::Mismatch {
                current: stored.to_record(),
            });
        }
        if changes.is_empty() {
            return Ok(WriteOutcome::Applied(stored.to_record()));
        }

        let updated = Self::apply_versioned(&rw, &stored, changes)?;
        rw.commit()?;

        debug!(
            %id,
            fields = %changes.fields(),
            previous = %expected,
            token = %updated.token,
            "conditional write applied"
        );
        Ok(WriteOutcome::Applied(updated))
    }

    /// Apply `changes` on top of `stored` and stamp a fresh token, inside `rw`.
    fn apply_versioned(
        rw: &RwTransaction<'_>,
        stored: &StoredVersionedRecord,
        changes: &ChangeSet,
    ) -> Result<VersionedRecord> {
        let mut fields = stored.fields();
        changes.apply_to(&mut fields);
        let token = next_token(rw)?;
        let updated = StoredVersionedRecord::new(RecordId::new(stored.id), &fields, token);
        rw.upsert(updated.clone())?;
        Ok(updated.to_record())
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Delete every bare record and insert exactly one seed row.
    pub fn reset_records(&self, id: RecordId, fields: &Fields) -> Result<Record> {
        let rw = self.db.rw_transaction()?;
        let existing: Vec<StoredRecord> = Self::scan_all(&rw)?;
        let removed = existing.len();
        for stored in existing {
            rw.remove(stored)?;
        }
        let seed = Record::new(id, fields.clone());
        rw.insert(StoredRecord::from_record(&seed))?;
        rw.commit()?;

        info!(%id, removed, "reset bare records");
        Ok(seed)
    }

    /// Delete every versioned record and insert exactly one seed row.
    ///
    /// The token clock is not rewound; the seed row gets a fresh token.
    pub fn reset_versioned(&self, id: RecordId, fields: &Fields) -> Result<VersionedRecord> {
        let rw = self.db.rw_transaction()?;
        let existing: Vec<StoredVersionedRecord> = Self::scan_all(&rw)?;
        let removed = existing.len();
        for stored in existing {
            rw.remove(stored)?;
        }
        let token = next_token(&rw)?;
        let seed = StoredVersionedRecord::new(id, fields, token);
        rw.insert(seed.clone())?;
        rw.commit()?;

        info!(%id, removed, %token, "reset versioned records");
        Ok(seed.to_record())
    }

    /// Clear all records of both kinds.
    pub fn clear(&self) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        for stored in Self::scan_all::<StoredRecord>(&rw)? {
            rw.remove(stored)?;
        }
        for stored in Self::scan_all::<StoredVersionedRecord>(&rw)? {
            rw.remove(stored)?;
        }
        rw.commit()?;
        info!("cleared record store");
        Ok(())
    }

    fn scan_all<T: ToInput>(rw: &RwTransaction<'_>) -> Result<Vec<T>> {
        let scan = rw.scan().primary::<T>()?;
        let iter = scan.all()?;
        let items: std::result::Result<Vec<T>, _> = iter.collect();
        items.map_err(|e| Error::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowver_core::Price;

    fn widget() -> Fields {
        Fields::new("Widget", 100, Price::from_cents(1000))
    }

    fn seeded() -> (Store, VersionedRecord) {
        let store = Store::in_memory().unwrap();
        let seed = store.reset_versioned(RecordId(1), &widget()).unwrap();
        (store, seed)
    }

    #[test]
    fn test_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Store>();
    }

    #[test]
    fn test_insert_and_read_record() {
        let store = Store::in_memory().unwrap();
        let record = Record::new(RecordId(7), widget());
        store.insert_record(&record).unwrap();

        assert_eq!(store.read_record(RecordId(7)).unwrap(), Some(record));
        assert_eq!(store.read_record(RecordId(8)).unwrap(), None);
    }

    #[test]
    fn test_insert_duplicate_rejected() {
        let store = Store::in_memory().unwrap();
        let record = Record::new(RecordId(7), widget());
        store.insert_record(&record).unwrap();
        assert!(matches!(
            store.insert_record(&record),
            Err(Error::DuplicateKey(RecordId(7)))
        ));

        store.insert_versioned(RecordId(7), &widget()).unwrap();
        assert!(matches!(
            store.insert_versioned(RecordId(7), &widget()),
            Err(Error::DuplicateKey(RecordId(7)))
        ));
    }

    #[test]
    fn test_write_record_touches_only_named_fields() {
        let store = Store::in_memory().unwrap();
        store.reset_records(RecordId(1), &widget()).unwrap();

        store
            .write_record(RecordId(1), &ChangeSet::new().set_stock(75))
            .unwrap();
        let after = store
            .write_record(RecordId(1), &ChangeSet::new().set_name("Gadget"))
            .unwrap();

        assert_eq!(after.fields.stock, 75);
        assert_eq!(after.fields.name, "Gadget");
        assert_eq!(after.fields.price, Price::from_cents(1000));
    }

    #[test]
    fn test_write_record_missing() {
        let store = Store::in_memory().unwrap();
        let err = store
            .write_record(RecordId(9), &ChangeSet::new().set_stock(1))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(RecordId(9))));
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_reads_of_unmodified_row_share_token() {
        let (store, seed) = seeded();
        let a = store.read_versioned(RecordId(1)).unwrap().unwrap();
        let b = store.read_versioned(RecordId(1)).unwrap().unwrap();
        assert_eq!(a.token, b.token);
        assert_eq!(a.token, seed.token);
    }

    #[test]
    fn test_every_write_changes_token() {
        let (store, seed) = seeded();
        let mut previous = seed.token;

        for stock in [90, 80, 80] {
            let updated = store
                .write_versioned(RecordId(1), &ChangeSet::new().set_stock(stock))
                .unwrap();
            assert_ne!(updated.token, previous);
            previous = updated.token;
        }

        let outcome = store
            .write_versioned_if(RecordId(1), &ChangeSet::new().set_name("Gadget"), previous)
            .unwrap();
        match outcome {
            WriteOutcome::Applied(record) => assert_ne!(record.token, previous),
            other => panic!("Expected Applied, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_write_match() {
        let (store, seed) = seeded();
        let outcome = store
            .write_versioned_if(RecordId(1), &ChangeSet::new().set_stock(42), seed.token)
            .unwrap();

        let WriteOutcome::Applied(record) = outcome else {
            panic!("Expected Applied");
        };
        assert_eq!(record.fields.stock, 42);
        assert_eq!(store.read_versioned(RecordId(1)).unwrap(), Some(record));
    }

    #[test]
    fn test_conditional_write_mismatch_writes_nothing() {
        let (store, seed) = seeded();
        let external = store
            .write_versioned(RecordId(1), &ChangeSet::new().set_stock(50))
            .unwrap();

        let outcome = store
            .write_versioned_if(RecordId(1), &ChangeSet::new().set_stock(1000), seed.token)
            .unwrap();

        assert_eq!(
            outcome,
            WriteOutcome::Mismatch {
                current: external.clone()
            }
        );
        assert_eq!(store.read_versioned(RecordId(1)).unwrap(), Some(external));
    }

    #[test]
    fn test_same_expected_token_succeeds_once() {
        let (store, seed) = seeded();
        let first = store
            .write_versioned_if(RecordId(1), &ChangeSet::new().set_stock(1), seed.token)
            .unwrap();
        let second = store
            .write_versioned_if(RecordId(1), &ChangeSet::new().set_stock(2), seed.token)
            .unwrap();

        assert!(first.is_applied());
        assert!(matches!(second, WriteOutcome::Mismatch { .. }));
        let row = store.read_versioned(RecordId(1)).unwrap().unwrap();
        assert_eq!(row.fields.stock, 1);
    }

    #[test]
    fn test_conditional_write_missing() {
        let (store, seed) = seeded();
        let outcome = store
            .write_versioned_if(RecordId(2), &ChangeSet::new().set_stock(1), seed.token)
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Missing);
    }

    #[test]
    fn test_empty_change_set_keeps_token() {
        let (store, seed) = seeded();
        let outcome = store
            .write_versioned_if(RecordId(1), &ChangeSet::new(), seed.token)
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Applied(seed.clone()));

        let direct = store
            .write_versioned(RecordId(1), &ChangeSet::new())
            .unwrap();
        assert_eq!(direct.token, seed.token);
    }

    #[test]
    fn test_reset_reseeds_single_row_with_fresh_token() {
        let (store, seed) = seeded();
        store.insert_versioned(RecordId(2), &widget()).unwrap();

        let reseeded = store.reset_versioned(RecordId(1), &widget()).unwrap();

        assert_ne!(reseeded.token, seed.token);
        assert_eq!(store.read_versioned(RecordId(2)).unwrap(), None);
        assert_eq!(store.all_versioned().unwrap(), vec![reseeded]);
    }

    #[test]
    fn test_clear() {
        let (store, _) = seeded();
        store.reset_records(RecordId(1), &widget()).unwrap();
        store.clear().unwrap();

        assert_eq!(store.count_records().unwrap(), 0);
        assert_eq!(store.count_versioned().unwrap(), 0);
    }

    #[test]
    fn test_file_backed_store_keeps_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.db");

        let token = {
            let store = Store::open(&path).unwrap();
            store.reset_versioned(RecordId(1), &widget()).unwrap().token
        };

        let store = Store::open(&path).unwrap();
        let row = store.read_versioned(RecordId(1)).unwrap().unwrap();
        assert_eq!(row.token, token);

        let updated = store
            .write_versioned(RecordId(1), &ChangeSet::new().set_stock(5))
            .unwrap();
        assert_ne!(updated.token, token);
    }
}
