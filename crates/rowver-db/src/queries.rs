//! Common query patterns for the database.

use crate::error::{Error, Result};
use crate::models::*;
use crate::store::Store;
use rowver_core::{Record, VersionedRecord};

impl Store {
    /// Get all bare records, in ID order.
    pub fn all_records(&self) -> Result<Vec<Record>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredRecord>()?;
        let iter = scan.all()?;
        let records: std::result::Result<Vec<StoredRecord>, _> = iter.collect();
        let records = records.map_err(|e| Error::Database(e.to_string()))?;
        Ok(records.into_iter().map(|s| s.to_record()).collect())
    }

    /// Get all versioned records, in ID order.
    pub fn all_versioned(&self) -> Result<Vec<VersionedRecord>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredVersionedRecord>()?;
        let iter = scan.all()?;
        let records: std::result::Result<Vec<StoredVersionedRecord>, _> = iter.collect();
        let records = records.map_err(|e| Error::Database(e.to_string()))?;
        Ok(records.into_iter().map(|s| s.to_record()).collect())
    }

    /// Count bare records.
    pub fn count_records(&self) -> Result<usize> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredRecord>()?;
        let iter = scan.all()?;
        Ok(iter.count())
    }

    /// Count versioned records.
    pub fn count_versioned(&self) -> Result<usize> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredVersionedRecord>()?;
        let iter = scan.all()?;
        Ok(iter.count())
    }

    /// Number of version tokens the store has issued so far.
    pub fn tokens_issued(&self) -> Result<u64> {
        let r = self.db.r_transaction()?;
        let clock: Option<StoredTokenClock> = r.get().primary(TOKEN_CLOCK_ID.to_string())?;
        Ok(clock.map(|c| c.last).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowver_core::{ChangeSet, Fields, Price, RecordId};

    #[test]
    fn test_all_records_in_id_order() {
        let store = Store::in_memory().unwrap();
        let fields = Fields::new("Widget", 1, Price::from_cents(100));
        for id in [3, 1, 2] {
            store
                .insert_record(&Record::new(RecordId(id), fields.clone()))
                .unwrap();
        }

        let ids: Vec<u64> = store
            .all_records()
            .unwrap()
            .into_iter()
            .map(|r| r.id.raw())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.count_records().unwrap(), 3);
    }

    #[test]
    fn test_tokens_issued_counts_versioned_writes_only() {
        let store = Store::in_memory().unwrap();
        assert_eq!(store.tokens_issued().unwrap(), 0);

        let fields = Fields::new("Widget", 100, Price::from_cents(1000));
        store.reset_records(RecordId(1), &fields).unwrap();
        store
            .write_record(RecordId(1), &ChangeSet::new().set_stock(5))
            .unwrap();
        assert_eq!(store.tokens_issued().unwrap(), 0);

        store.reset_versioned(RecordId(1), &fields).unwrap();
        store
            .write_versioned(RecordId(1), &ChangeSet::new().set_stock(5))
            .unwrap();
        assert_eq!(store.tokens_issued().unwrap(), 2);
        assert_eq!(store.count_versioned().unwrap(), 1);
    }
}
