//! In-memory storage primitive.

use super::Storage;
use crate::error::{Result, StoreError};
use crate::patch::Patch;
use crate::query::Query;
use crate::subscriptions::Update;
use crate::types::{IdMap, Identity, Item, ItemId, PutRequest};
use std::sync::Arc;
use tracing::debug;

/// Storage over an owned ordered `Vec` plus its inverse id index.
pub struct MemoryStorage<T: Item> {
    data: Vec<T>,
    map: IdMap,
    identity: Arc<dyn Identity<T>>,
}

impl<T: Item> MemoryStorage<T> {
    /// Empty storage with the given identity policy.
    pub fn new(identity: Arc<dyn Identity<T>>) -> Self {
        Self {
            data: Vec::new(),
            map: IdMap::new(),
            identity,
        }
    }

    /// Storage pre-seeded with items. Items lacking an id get a
    /// generated one; duplicate ids are rejected.
    pub fn with_items(identity: Arc<dyn Identity<T>>, items: Vec<T>) -> Result<Self> {
        let mut storage = Self::new(identity);
        for item in items {
            storage.add(item)?;
        }
        Ok(storage)
    }

    /// The ordered data, borrowed.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Extract the item's id, generating and stamping one if missing.
    fn resolve_id(&self, item: T) -> Result<(ItemId, T)> {
        match self.identity.id_of(&item) {
            Some(id) => Ok((id, item)),
            None => {
                let id = self.identity.generate_id();
                let stamped = self.identity.with_id(item, &id)?;
                Ok((id, stamped))
            }
        }
    }

    fn update_at(&mut self, id: ItemId, index: usize, new_item: T, diff: Patch) -> Update<T> {
        self.data[index] = new_item.clone();
        debug!(id = %id, index, ops = diff.len(), "updated item");
        Update::Updated {
            id,
            item: new_item,
            diff,
            previous_index: Some(index),
            index: Some(index),
        }
    }

    /// Merge per-id patches in submission order, keeping first-seen
    /// positions.
    fn merge_patches(entries: Vec<(ItemId, Patch)>) -> Vec<(ItemId, Patch)> {
        let mut merged: Vec<(ItemId, Patch)> = Vec::new();
        for (id, patch) in entries {
            match merged.iter_mut().find(|(existing, _)| *existing == id) {
                Some((_, existing_patch)) => {
                    let combined = std::mem::take(existing_patch).merge(patch);
                    *existing_patch = combined;
                }
                None => merged.push((id, patch)),
            }
        }
        merged
    }
}

impl<T: Item> Storage<T> for MemoryStorage<T> {
    fn identity(&self) -> &dyn Identity<T> {
        self.identity.as_ref()
    }

    fn is_update(&self, item: &T) -> bool {
        self.identity
            .id_of(item)
            .map(|id| self.map.contains(&id))
            .unwrap_or(false)
    }

    fn get(&self, id: &ItemId) -> Result<T> {
        self.map
            .entry(id, &self.data)
            .map(|entry| entry.item.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn add(&mut self, item: T) -> Result<Update<T>> {
        let (id, item) = self.resolve_id(item)?;
        if self.map.contains(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        let index = self.data.len();
        self.data.push(item.clone());
        self.map.insert(id.clone(), index);
        debug!(id = %id, index, "added item");

        Ok(Update::Added { id, item, index })
    }

    fn put(&mut self, request: PutRequest<T>) -> Result<Vec<Update<T>>> {
        match request {
            PutRequest::Item(item) => {
                let id = self.identity.id_of(&item);
                match id.and_then(|id| self.map.get(&id).map(|index| (id, index))) {
                    Some((id, index)) => {
                        let previous = self.data[index].clone();
                        let diff = Patch::diff_items(&previous, &item)?;
                        Ok(vec![self.update_at(id, index, item, diff)])
                    }
                    None => Ok(vec![self.add(item)?]),
                }
            }
            PutRequest::Patches(entries) => {
                let mut events = Vec::new();
                for (id, patch) in Self::merge_patches(entries) {
                    let index = self
                        .map
                        .get(&id)
                        .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                    let previous = self.data[index].clone();
                    let new_item = patch.apply(&previous)?;
                    let diff = Patch::diff_items(&previous, &new_item)?;
                    events.push(self.update_at(id, index, new_item, diff));
                }
                Ok(events)
            }
        }
    }

    fn delete(&mut self, id: &ItemId) -> Result<Update<T>> {
        let index = self
            .map
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        self.data.remove(index);
        self.map.remove(id);
        self.map.shift_for_removal(index);
        debug!(id = %id, index, "deleted item");

        Ok(Update::Deleted {
            id: id.clone(),
            previous_index: index,
        })
    }

    fn fetch(&self, queries: &[Query<T>]) -> Result<Vec<T>> {
        let mut out = self.data.clone();
        for query in queries {
            out = query.apply(&out);
        }
        Ok(out)
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Filter, Range, Sort};
    use crate::types::FieldIdentity;
    use serde_json::{json, Value};

    fn storage() -> MemoryStorage<Value> {
        MemoryStorage::new(Arc::new(FieldIdentity::default()))
    }

    #[test]
    fn test_add_and_get() {
        let mut s = storage();
        let event = s.add(json!({"id": "1", "v": 1})).unwrap();
        assert!(matches!(event, Update::Added { index: 0, .. }));

        assert_eq!(s.get(&ItemId::from("1")).unwrap()["v"], 1);
        assert!(matches!(
            s.get(&ItemId::from("missing")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_generates_missing_ids() {
        let mut s = storage();
        let event = s.add(json!({"v": 7})).unwrap();
        let Update::Added { id, item, .. } = event else {
            panic!("expected Added");
        };
        assert_eq!(item["id"], id.as_str());
        assert!(s.is_update(&item));
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut s = storage();
        s.add(json!({"id": "1", "v": 1})).unwrap();
        let err = s.add(json!({"id": "1", "v": 2})).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(_)));
        // first item untouched
        assert_eq!(s.get(&ItemId::from("1")).unwrap()["v"], 1);
    }

    #[test]
    fn test_put_full_item_updates_in_place() {
        let mut s = storage();
        s.add(json!({"id": "1", "v": 1})).unwrap();
        s.add(json!({"id": "2", "v": 2})).unwrap();

        let events = s.put(PutRequest::Item(json!({"id": "1", "v": 9}))).unwrap();
        assert_eq!(events.len(), 1);
        let Update::Updated { diff, index, previous_index, .. } = &events[0] else {
            panic!("expected Updated");
        };
        assert_eq!(diff.to_string(), "set(v,9)");
        assert_eq!((*previous_index, *index), (Some(0), Some(0)));
        assert_eq!(s.data()[0]["v"], 9);
    }

    #[test]
    fn test_put_unknown_item_becomes_add() {
        let mut s = storage();
        let events = s.put(PutRequest::Item(json!({"id": "9", "v": 9}))).unwrap();
        assert!(matches!(events[0], Update::Added { .. }));
    }

    #[test]
    fn test_put_patches_merge_per_id() {
        let mut s = storage();
        s.add(json!({"id": "1", "v": 1, "w": 0})).unwrap();

        let events = s
            .put(PutRequest::Patches(vec![
                (ItemId::from("1"), Patch::new().set("v", 5)),
                (ItemId::from("1"), Patch::new().set("v", 9).set("w", 1)),
            ]))
            .unwrap();

        // merged into a single update
        assert_eq!(events.len(), 1);
        let item = s.get(&ItemId::from("1")).unwrap();
        assert_eq!(item["v"], 9);
        assert_eq!(item["w"], 1);
    }

    #[test]
    fn test_put_patch_unknown_id_fails() {
        let mut s = storage();
        let err = s
            .put(PutRequest::patch("nope", Patch::new().set("v", 1)))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_delete_reindexes_followers() {
        let mut s = storage();
        for i in 0..4 {
            s.add(json!({"id": i.to_string(), "v": i})).unwrap();
        }

        let event = s.delete(&ItemId::from("1")).unwrap();
        assert!(matches!(event, Update::Deleted { previous_index: 1, .. }));

        // map positions track the shifted data
        for (index, item) in s.data().iter().enumerate() {
            let id = ItemId::from(item["id"].as_str().unwrap());
            assert_eq!(s.map.get(&id), Some(index));
        }
    }

    #[test]
    fn test_fetch_applies_queries_in_order() {
        let mut s = storage();
        for (id, v) in [("1", 3), ("2", 1), ("3", 2), ("4", 5)] {
            s.add(json!({"id": id, "v": v})).unwrap();
        }

        let queries: Vec<Query<Value>> = vec![
            Filter::gt("v", 1).into(),
            Sort::by("v").into(),
            Range::new(0, 2).into(),
        ];
        let out = s.fetch(&queries).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["v"], 2);
        assert_eq!(out[1]["v"], 3);
    }
}
