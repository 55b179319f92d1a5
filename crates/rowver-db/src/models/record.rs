//! Record models for database storage.

use native_db::*;
use native_model::{native_model, Model};
use rowver_core::{Fields, Price, Record, RecordId, VersionToken, VersionedRecord};
use serde::{Deserialize, Serialize};

/// Stored bare record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredRecord {
    /// Primary key - record ID.
    #[primary_key]
    pub id: u64,
    pub name: String,
    pub stock: i64,
    /// Price in cents.
    pub price_cents: i64,
}

impl StoredRecord {
    /// Create from a bare Record.
    pub fn from_record(record: &Record) -> Self {
        Self {
            id: record.id.raw(),
            name: record.fields.name.clone(),
            stock: record.fields.stock,
            price_cents: record.fields.price.cents(),
        }
    }

    /// Convert to a bare Record.
    pub fn to_record(&self) -> Record {
        Record::new(RecordId::new(self.id), self.fields())
    }

    pub fn fields(&self) -> Fields {
        Fields::new(
            self.name.clone(),
            self.stock,
            Price::from_cents(self.price_cents),
        )
    }

    /// Overwrite the stored columns with `fields`.
    pub fn set_fields(&mut self, fields: &Fields) {
        self.name = fields.name.clone();
        self.stock = fields.stock;
        self.price_cents = fields.price.cents();
    }
}

/// Stored versioned record.
///
/// `token` is written only by the store's write paths, always with a value
/// taken from the token clock in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredVersionedRecord {
    /// Primary key - record ID.
    #[primary_key]
    pub id: u64,
    pub name: String,
    pub stock: i64,
    /// Price in cents.
    pub price_cents: i64,
    /// Raw version token bytes.
    pub token: [u8; 8],
}

impl StoredVersionedRecord {
    /// Create a row for `id` holding `fields` under `token`.
    pub fn new(id: RecordId, fields: &Fields, token: VersionToken) -> Self {
        Self {
            id: id.raw(),
            name: fields.name.clone(),
            stock: fields.stock,
            price_cents: fields.price.cents(),
            token: *token.as_bytes(),
        }
    }

    /// Convert to a VersionedRecord.
    pub fn to_record(&self) -> VersionedRecord {
        VersionedRecord::new(RecordId::new(self.id), self.fields(), self.token())
    }

    pub fn fields(&self) -> Fields {
        Fields::new(
            self.name.clone(),
            self.stock,
            Price::from_cents(self.price_cents),
        )
    }

    pub fn token(&self) -> VersionToken {
        VersionToken::from_bytes(self.token)
    }
}
