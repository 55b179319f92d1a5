//! Partial writes and dirty-field sets
//!
//! A `ChangeSet` is the unit a writer hands to the store: the fields it
//! intends to overwrite and nothing else. Fields missing from the set keep
//! whatever value the row holds at write time, which is exactly what makes a
//! bare record "last writer wins" per field rather than per row.

use crate::record::Fields;
use crate::value::{Field, FieldValue, Price};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field assignment with its value already decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldChange {
    SetName(String),
    SetStock(i64),
    SetPrice(Price),
}

impl FieldChange {
    /// The field this change writes
    pub fn field(&self) -> Field {
        match self {
            FieldChange::SetName(_) => Field::Name,
            FieldChange::SetStock(_) => Field::Stock,
            FieldChange::SetPrice(_) => Field::Price,
        }
    }

    /// The value this change writes
    pub fn value(&self) -> FieldValue {
        match self {
            FieldChange::SetName(name) => FieldValue::Text(name.clone()),
            FieldChange::SetStock(stock) => FieldValue::Int(*stock),
            FieldChange::SetPrice(price) => FieldValue::Price(*price),
        }
    }

    /// Copy the value of `field` out of `fields`
    pub fn from_fields(field: Field, fields: &Fields) -> Self {
        match field {
            Field::Name => FieldChange::SetName(fields.name.clone()),
            Field::Stock => FieldChange::SetStock(fields.stock),
            Field::Price => FieldChange::SetPrice(fields.price),
        }
    }

    fn apply_to(&self, fields: &mut Fields) {
        match self {
            FieldChange::SetName(name) => fields.name = name.clone(),
            FieldChange::SetStock(stock) => fields.stock = *stock,
            FieldChange::SetPrice(price) => fields.price = *price,
        }
    }
}

/// Ordered set of field assignments, at most one per field
///
/// Pushing a second change for a field replaces the first one in place, so a
/// change set never writes the same column twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Vec<FieldChange>,
}

impl ChangeSet {
    /// Create a new empty ChangeSet
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a change, replacing any earlier change to the same field
    pub fn push(&mut self, change: FieldChange) {
        let field = change.field();
        match self.changes.iter_mut().find(|c| c.field() == field) {
            Some(existing) => *existing = change,
            None => self.changes.push(change),
        }
    }

    /// Builder form of [`ChangeSet::push`]
    pub fn with(mut self, change: FieldChange) -> Self {
        self.push(change);
        self
    }

    pub fn set_name(self, name: impl Into<String>) -> Self {
        self.with(FieldChange::SetName(name.into()))
    }

    pub fn set_stock(self, stock: i64) -> Self {
        self.with(FieldChange::SetStock(stock))
    }

    pub fn set_price(self, price: Price) -> Self {
        self.with(FieldChange::SetPrice(price))
    }

    /// Build a change set copying `dirty` fields out of `fields`
    pub fn from_dirty(fields: &Fields, dirty: FieldSet) -> Self {
        let mut set = Self::new();
        for field in dirty.iter() {
            set.push(FieldChange::from_fields(field, fields));
        }
        set
    }

    /// Get the number of changes
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if the ChangeSet is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Get an iterator over the changes
    pub fn iter(&self) -> impl Iterator<Item = &FieldChange> {
        self.changes.iter()
    }

    /// The set of fields this change set writes
    pub fn fields(&self) -> FieldSet {
        self.changes.iter().map(FieldChange::field).collect()
    }

    /// Overwrite the changed fields of `fields`, leaving the rest untouched
    pub fn apply_to(&self, fields: &mut Fields) {
        for change in &self.changes {
            change.apply_to(fields);
        }
    }
}

impl FromIterator<FieldChange> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = FieldChange>>(iter: I) -> Self {
        let mut set = Self::new();
        for change in iter {
            set.push(change);
        }
        set
    }
}

/// Bitset of fields, used as the dirty-field set of a local copy
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(u8);

impl FieldSet {
    /// The empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every field
    pub fn all() -> Self {
        Field::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn remove(&mut self, field: Field) {
        self.0 &= !field.bit();
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_disjoint(&self, other: &FieldSet) -> bool {
        self.0 & other.0 == 0
    }

    pub fn intersection(&self, other: &FieldSet) -> FieldSet {
        FieldSet(self.0 & other.0)
    }

    /// Fields in column order
    pub fn iter(&self) -> impl Iterator<Item = Field> {
        let set = *self;
        Field::ALL.into_iter().filter(move |f| set.contains(*f))
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = FieldSet::empty();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|field| field.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}
