//! Transactions: batched heterogeneous mutations with one event.
//!
//! A transaction queues add/put/delete requests and commits them
//! sequentially against one store as a single logical unit, surfacing
//! exactly one `Batch` event. Transactions on the same store serialize
//! behind its write lock; partial effects never interleave.
//!
//! The guarantee is at-least-applied, not atomic: on failure the
//! remaining requests are skipped and the error reports the failing
//! step, but requests already applied are NOT rolled back and their
//! events are still delivered.

use crate::error::Result;
use crate::patch::Patch;
use crate::store::{Request, Store};
use crate::subscriptions::Update;
use crate::types::{Item, ItemId, PutRequest};

/// A pending batch of mutation requests against one store.
pub struct Transaction<T: Item> {
    store: Store<T>,
    requests: Vec<Request<T>>,
}

impl<T: Item> Transaction<T> {
    pub(crate) fn new(store: Store<T>) -> Self {
        Self {
            store,
            requests: Vec::new(),
        }
    }

    /// Queue an add.
    pub fn add(&mut self, item: T) -> &mut Self {
        self.requests.push(Request::Add(item));
        self
    }

    /// Queue a full-item put.
    pub fn put(&mut self, item: T) -> &mut Self {
        self.requests.push(Request::Put(PutRequest::Item(item)));
        self
    }

    /// Queue a patch put for one id.
    pub fn put_patch(&mut self, id: impl Into<ItemId>, patch: Patch) -> &mut Self {
        self.requests
            .push(Request::Put(PutRequest::patch(id, patch)));
        self
    }

    /// Queue an arbitrary put request.
    pub fn put_request(&mut self, request: PutRequest<T>) -> &mut Self {
        self.requests.push(Request::Put(request));
        self
    }

    /// Queue a delete.
    pub fn delete(&mut self, id: impl Into<ItemId>) -> &mut Self {
        self.requests.push(Request::Delete(id.into()));
        self
    }

    /// Number of queued requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Execute the queued requests in order and deliver their events
    /// as one `Batch`. Returns the individual results concatenated in
    /// execution order. On failure, reports the first failing step;
    /// effects applied before it remain (see module docs).
    pub fn commit(self) -> Result<Vec<Update<T>>> {
        self.store.apply_requests(self.requests, true)
    }
}
