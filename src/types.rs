//! Core types for the collection store.

use crate::error::{Result, StoreError};
use crate::patch::Patch;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Blanket alias for the bounds every stored item must satisfy.
///
/// Items are opaque to the store except through their JSON projection,
/// which is what diffs, patches, and property queries operate on.
pub trait Item: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static> Item for T {}

/// Unique identifier for an item within a store hierarchy.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

/// An item bound to its current position in a store's ordered data.
#[derive(Debug, PartialEq, Eq)]
pub struct IndexedEntry<'a, T> {
    pub item: &'a T,
    pub index: usize,
}

/// Inverse index from id to position in the ordered data sequence.
///
/// Invariant: for every id present, the item at `data[map.get(id)]`
/// carries that id. Maintained in lock-step with every change to the
/// data sequence, either incrementally or by a full rebuild.
#[derive(Clone, Debug, Default)]
pub struct IdMap {
    positions: HashMap<ItemId, usize>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the map from an ordered data sequence.
    ///
    /// Fails with `DuplicateId` if two items project to the same id and
    /// with `InvalidOperation` if an item carries no id at all.
    pub fn rebuild<T>(data: &[T], identity: &dyn Identity<T>) -> Result<Self> {
        let mut map = Self::new();
        for (index, item) in data.iter().enumerate() {
            let id = identity.id_of(item).ok_or_else(|| {
                StoreError::InvalidOperation(format!("item at index {index} has no id"))
            })?;
            if map.positions.insert(id.clone(), index).is_some() {
                return Err(StoreError::DuplicateId(id));
            }
        }
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Look up an entry, binding the item reference to its position.
    pub fn entry<'a, T>(&self, id: &ItemId, data: &'a [T]) -> Option<IndexedEntry<'a, T>> {
        let index = self.get(id)?;
        data.get(index).map(|item| IndexedEntry { item, index })
    }

    pub fn insert(&mut self, id: ItemId, index: usize) -> Option<usize> {
        self.positions.insert(id, index)
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<usize> {
        self.positions.remove(id)
    }

    /// Shift positions after an item was removed at `removed_index`.
    pub fn shift_for_removal(&mut self, removed_index: usize) {
        for position in self.positions.values_mut() {
            if *position > removed_index {
                *position -= 1;
            }
        }
    }

    /// Shift positions before an item is inserted at `inserted_index`.
    pub fn shift_for_insert(&mut self, inserted_index: usize) {
        for position in self.positions.values_mut() {
            if *position >= inserted_index {
                *position += 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

/// A single mutation request accepted by `put`.
///
/// Callers submit either a full replacement item or a set of
/// `(id, Patch)` entries for partial updates. Multiple patches for the
/// same id within one call are merged in submission order before
/// application.
#[derive(Clone, Debug)]
pub enum PutRequest<T> {
    /// Full item; map membership decides update vs. add.
    Item(T),
    /// Path-addressed partial updates keyed by id.
    Patches(Vec<(ItemId, Patch)>),
}

impl<T> PutRequest<T> {
    /// Convenience constructor for a single-entry patch set.
    pub fn patch(id: impl Into<ItemId>, patch: Patch) -> Self {
        PutRequest::Patches(vec![(id.into(), patch)])
    }
}

/// Pluggable identity policy: how ids are read from, written to, and
/// generated for items.
pub trait Identity<T>: Send + Sync {
    /// Extract the id carried by an item, if any.
    fn id_of(&self, item: &T) -> Option<ItemId>;

    /// Return a copy of the item carrying the given id.
    fn with_id(&self, item: T, id: &ItemId) -> Result<T>;

    /// Generate a fresh id for an item that carries none.
    fn generate_id(&self) -> ItemId {
        ItemId(Uuid::new_v4().to_string())
    }
}

/// Identity stored in a named top-level property of the item's JSON
/// projection. The default property is `"id"`.
#[derive(Clone, Debug)]
pub struct FieldIdentity {
    property: String,
}

impl FieldIdentity {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }
}

impl Default for FieldIdentity {
    fn default() -> Self {
        Self::new("id")
    }
}

impl<T: Item> Identity<T> for FieldIdentity {
    fn id_of(&self, item: &T) -> Option<ItemId> {
        let projected = serde_json::to_value(item).ok()?;
        match projected.get(&self.property)? {
            Value::Null => None,
            Value::String(s) => Some(ItemId(s.clone())),
            other => Some(ItemId(other.to_string())),
        }
    }

    fn with_id(&self, item: T, id: &ItemId) -> Result<T> {
        let mut projected = serde_json::to_value(&item)?;
        match projected.as_object_mut() {
            Some(map) => {
                map.insert(self.property.clone(), Value::String(id.0.clone()));
            }
            None => {
                return Err(StoreError::InvalidOperation(
                    "cannot assign an id to a non-object item".to_string(),
                ))
            }
        }
        Ok(serde_json::from_value(projected)?)
    }
}
