//! Storage-primitive seam.
//!
//! A `Storage` implementation owns the authoritative data of a root
//! store and performs the concrete mutation/fetch work. The core never
//! assumes how the primitives do their job (in-memory mutation vs.
//! network request), only their result shape and event contract. A
//! remote-backed implementation differs from `MemoryStorage` only in
//! how these methods perform their I/O.

mod memory;

pub use memory::MemoryStorage;

use crate::error::Result;
use crate::query::Query;
use crate::subscriptions::Update;
use crate::types::{Identity, Item, ItemId, PutRequest};

/// Contract for a pluggable storage primitive.
pub trait Storage<T: Item>: Send + Sync {
    /// The identity policy items are keyed by.
    fn identity(&self) -> &dyn Identity<T>;

    /// Whether a full item designates an existing record (update) or a
    /// new one (add).
    fn is_update(&self, item: &T) -> bool;

    /// Resolve one id. Fails with `NotFound` if absent.
    fn get(&self, id: &ItemId) -> Result<T>;

    /// Insert a new item at the end of the ordered data. Fails with
    /// `DuplicateId` if its id is already present.
    fn add(&mut self, item: T) -> Result<Update<T>>;

    /// Apply one put request. Full items update in place or fall back
    /// to an add; patch sets resolve each id and fail with `NotFound`
    /// on absent ones. A patch set may touch several ids, hence the
    /// event list.
    fn put(&mut self, request: PutRequest<T>) -> Result<Vec<Update<T>>>;

    /// Remove one id, re-indexing what follows. Fails with `NotFound`.
    fn delete(&mut self, id: &ItemId) -> Result<Update<T>>;

    /// Materialize the data with the given queries applied
    /// left-to-right.
    fn fetch(&self, queries: &[Query<T>]) -> Result<Vec<T>>;

    /// Number of stored items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
