//! Bare and versioned records

use crate::identity::{RecordId, RecordKind};
use crate::token::VersionToken;
use crate::value::{Field, FieldValue, Price};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mutable content shared by both record kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields {
    pub name: String,
    /// Quantity on hand; expected to be non-negative, not enforced
    pub stock: i64,
    pub price: Price,
}

impl Fields {
    pub fn new(name: impl Into<String>, stock: i64, price: Price) -> Self {
        Self {
            name: name.into(),
            stock,
            price,
        }
    }

    /// Read one field as a dynamic value
    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Name => FieldValue::Text(self.name.clone()),
            Field::Stock => FieldValue::Int(self.stock),
            Field::Price => FieldValue::Price(self.price),
        }
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={} stock={} price={}",
            FieldValue::from(self.name.as_str()),
            self.stock,
            self.price
        )
    }
}

/// A row with no concurrency metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub fields: Fields,
}

impl Record {
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }
}

/// A row guarded by a store-assigned version token
///
/// The token is whatever the store held when this copy was read. Holding a
/// `VersionedRecord` never keeps the row from changing underneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub id: RecordId,
    pub fields: Fields,
    pub token: VersionToken,
}

impl VersionedRecord {
    pub fn new(id: RecordId, fields: Fields, token: VersionToken) -> Self {
        Self { id, fields, token }
    }
}

/// Read-only view over either record kind
///
/// Lets snapshot and reporting code treat both kinds uniformly.
pub trait Observable {
    fn id(&self) -> RecordId;

    fn kind(&self) -> RecordKind;

    fn fields(&self) -> &Fields;

    /// `None` for bare records
    fn token(&self) -> Option<VersionToken>;
}

impl Observable for Record {
    fn id(&self) -> RecordId {
        self.id
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Bare
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn token(&self) -> Option<VersionToken> {
        None
    }
}

impl Observable for VersionedRecord {
    fn id(&self) -> RecordId {
        self.id
    }

    fn kind(&self) -> RecordKind {
        RecordKind::Versioned
    }

    fn fields(&self) -> &Fields {
        &self.fields
    }

    fn token(&self) -> Option<VersionToken> {
        Some(self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_get() {
        let fields = Fields::new("Widget", 100, Price::from_cents(1000));
        assert_eq!(fields.get(Field::Name), FieldValue::from("Widget"));
        assert_eq!(fields.get(Field::Stock), FieldValue::Int(100));
        assert_eq!(
            fields.get(Field::Price),
            FieldValue::Price(Price::from_cents(1000))
        );
    }

    #[test]
    fn test_fields_display() {
        let fields = Fields::new("Widget", 75, Price::from_cents(1250));
        assert_eq!(fields.to_string(), "name=\"Widget\" stock=75 price=12.50");
    }

    #[test]
    fn test_observable_kinds() {
        let fields = Fields::new("Widget", 100, Price::from_cents(1000));
        let bare = Record::new(RecordId(1), fields.clone());
        let token = VersionToken::from_bytes([0, 0, 0, 0, 0, 0, 0, 1]);
        let versioned = VersionedRecord::new(RecordId(1), fields, token);

        assert_eq!(bare.kind(), RecordKind::Bare);
        assert_eq!(bare.token(), None);
        assert_eq!(versioned.kind(), RecordKind::Versioned);
        assert_eq!(versioned.token(), Some(token));
        assert_eq!(bare.fields(), versioned.fields());
    }
}
