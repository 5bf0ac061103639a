//! Store core: versioned data/index ownership, query-derived views,
//! and live update propagation.
//!
//! A `Store` is either a root (owning a storage primitive) or a
//! derived view (holding its source plus a query list). Mutations are
//! always authoritative at the root; derived views are read/query
//! layers that forward writes and keep their caches consistent either
//! by staleness-checked recomputation or, in live-tracking mode, by
//! replaying the source's mutation events.

use crate::error::{Result, StoreError};
use crate::patch::Patch;
use crate::query::{to_query_string, Filter, Query, Range, Sort};
use crate::storage::{MemoryStorage, Storage};
use crate::subscriptions::{
    count_events, SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
    Update,
};
use crate::transaction::Transaction;
use crate::types::{FieldIdentity, IdMap, Identity, Item, ItemId, PutRequest};
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// One queued mutation request, as executed by `apply_requests`.
pub(crate) enum Request<T> {
    Add(T),
    Put(PutRequest<T>),
    Delete(ItemId),
}

enum Role<T: Item> {
    /// Owns the authoritative data through a storage primitive.
    Root { storage: Box<dyn Storage<T>> },
    /// Read/query layer over an ultimate source.
    Derived { source: Store<T>, live: bool },
}

struct ViewCache<T> {
    /// Cached sequence with every query except trailing ranges
    /// applied; `fetch` slices the ranges at materialization time.
    data: Vec<T>,
    /// Inverse index over `data`; maintained for live views only.
    map: IdMap,
    /// Roots: mutation counter. Views: source version the cache was
    /// computed at, advanced in lock-step while live.
    version: u64,
    synced: bool,
}

impl<T> Default for ViewCache<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            map: IdMap::new(),
            version: 0,
            synced: false,
        }
    }
}

struct StoreInner<T: Item> {
    role: RwLock<Role<T>>,
    /// Queries defining this view relative to its source, applied
    /// left-to-right. Empty for roots. Immutable after construction.
    queries: Vec<Query<T>>,
    identity: Arc<dyn Identity<T>>,
    cache: RwLock<ViewCache<T>>,
    subscriptions: SubscriptionManager<T>,
    /// Live views of this store, notified on every mutation.
    trackers: Mutex<Vec<Weak<StoreInner<T>>>>,
    /// Serializes logical operations, transactions included.
    write_lock: Mutex<()>,
}

/// Versioned, queryable collection store. Cheap to clone; clones share
/// the same underlying store.
pub struct Store<T: Item> {
    inner: Arc<StoreInner<T>>,
}

impl<T: Item> Clone for Store<T> {
    fn clone(&self) -> Self {
        Store {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Item> Store<T> {
    // --- Construction ---

    fn from_parts(role: Role<T>, queries: Vec<Query<T>>, identity: Arc<dyn Identity<T>>) -> Self {
        Store {
            inner: Arc::new(StoreInner {
                role: RwLock::new(role),
                queries,
                identity,
                cache: RwLock::new(ViewCache::default()),
                subscriptions: SubscriptionManager::new(),
                trackers: Mutex::new(Vec::new()),
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Root store over a caller-provided storage primitive.
    pub fn with_storage(
        storage: impl Storage<T> + 'static,
        identity: Arc<dyn Identity<T>>,
    ) -> Self {
        Self::from_parts(
            Role::Root {
                storage: Box::new(storage),
            },
            Vec::new(),
            identity,
        )
    }

    /// Empty in-memory root store keyed by the `"id"` property.
    pub fn memory() -> Self {
        Self::memory_with_identity(Arc::new(FieldIdentity::default()))
    }

    /// Empty in-memory root store with a custom identity policy.
    pub fn memory_with_identity(identity: Arc<dyn Identity<T>>) -> Self {
        let storage = MemoryStorage::new(Arc::clone(&identity));
        Self::with_storage(storage, identity)
    }

    /// In-memory root store pre-seeded with items.
    pub fn memory_with(items: Vec<T>) -> Result<Self> {
        let identity: Arc<dyn Identity<T>> = Arc::new(FieldIdentity::default());
        let storage = MemoryStorage::with_items(Arc::clone(&identity), items)?;
        Ok(Self::with_storage(storage, identity))
    }

    // --- Derivation ---

    /// Derive a new view with one more query appended. Views never
    /// chain sources: deriving from a view reuses its ultimate source
    /// and concatenates query lists.
    pub fn query(&self, query: impl Into<Query<T>>) -> Store<T> {
        let (source, mut queries) = {
            let role = self.inner.role.read();
            match &*role {
                Role::Root { .. } => (self.clone(), Vec::new()),
                Role::Derived { source, .. } => (source.clone(), self.inner.queries.clone()),
            }
        };
        queries.push(query.into());
        Store::from_parts(
            Role::Derived {
                source,
                live: false,
            },
            queries,
            Arc::clone(&self.inner.identity),
        )
    }

    /// Derived view restricted to items matching the filter.
    pub fn filter(&self, filter: Filter<T>) -> Store<T> {
        self.query(filter)
    }

    /// Derived view ordered by the sort.
    pub fn sort(&self, sort: Sort<T>) -> Store<T> {
        self.query(sort)
    }

    /// Derived view windowed to `[start, start + count)`.
    pub fn range(&self, start: usize, count: usize) -> Store<T> {
        self.query(Range::new(start, count))
    }

    // --- Reads ---

    /// Resolve items by id. Derived views forward to their source.
    pub fn get(&self, ids: &[ItemId]) -> Result<Vec<T>> {
        let source = {
            let role = self.inner.role.read();
            match &*role {
                Role::Root { storage } => {
                    return ids.iter().map(|id| storage.get(id)).collect()
                }
                Role::Derived { source, .. } => source.clone(),
            }
        };
        source.get(ids)
    }

    /// Resolve a single id.
    pub fn get_one(&self, id: impl Into<ItemId>) -> Result<T> {
        let id = id.into();
        self.get(std::slice::from_ref(&id))?
            .pop()
            .ok_or(StoreError::NotFound(id))
    }

    /// Materialize this view's current data.
    ///
    /// Roots serve their storage directly. A derived view whose cache
    /// is behind its source's version recomputes by re-applying its
    /// queries to the source's current data; otherwise the cached
    /// sequence is served without recomputation.
    pub fn fetch(&self) -> Result<Vec<T>> {
        let (source, live) = {
            let role = self.inner.role.read();
            match &*role {
                Role::Root { storage } => return storage.fetch(&[]),
                Role::Derived { source, live } => (source.clone(), *live),
            }
        };

        let source_version = source.version();
        {
            let cache = self.inner.cache.read();
            if cache.synced && cache.version == source_version {
                trace!(version = source_version, "fetch served from cache");
                return Ok(self.materialize(&cache.data));
            }
        }
        self.recompute(&source, live)
    }

    /// Current version: mutation counter for roots, synced source
    /// version for views.
    pub fn version(&self) -> u64 {
        self.inner.cache.read().version
    }

    /// Number of visible items.
    pub fn len(&self) -> Result<usize> {
        {
            let role = self.inner.role.read();
            if let Role::Root { storage } = &*role {
                return Ok(storage.len());
            }
        }
        Ok(self.fetch()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether this view maintains its cache from source events.
    pub fn is_live(&self) -> bool {
        matches!(&*self.inner.role.read(), Role::Derived { live: true, .. })
    }

    /// Whether this store derives from a source.
    pub fn is_derived(&self) -> bool {
        matches!(&*self.inner.role.read(), Role::Derived { .. })
    }

    /// The queries defining this view, in application order.
    pub fn queries(&self) -> &[Query<T>] {
        &self.inner.queries
    }

    /// Render the view's queries as one query string. Fails with
    /// `NotSerializable` if any query wraps an opaque function.
    pub fn query_string(&self) -> Result<String> {
        to_query_string(&self.inner.queries)
    }

    // --- Mutations ---

    /// Insert new items at the end of the ordered data. Ids are
    /// assigned where missing; an id already present fails that item
    /// with `DuplicateId`. Emits one `Added` event per item.
    pub fn add(&self, items: impl IntoIterator<Item = T>) -> Result<Vec<T>> {
        let requests: Vec<Request<T>> = items.into_iter().map(Request::Add).collect();
        let events = self.apply_requests(requests, false)?;
        Ok(collect_items(&events))
    }

    pub fn add_one(&self, item: T) -> Result<T> {
        self.add([item])?
            .pop()
            .ok_or_else(|| StoreError::InvalidOperation("add produced no item".to_string()))
    }

    /// Apply put requests: full items (map membership decides update
    /// vs. add) or per-id patch sets. A call with several requests is
    /// executed as an implicit transaction and delivered as one
    /// `Batch` event.
    pub fn put(&self, requests: impl IntoIterator<Item = PutRequest<T>>) -> Result<Vec<T>> {
        let requests: Vec<Request<T>> = requests.into_iter().map(Request::Put).collect();
        let batch = requests.len() > 1;
        let events = self.apply_requests(requests, batch)?;
        Ok(collect_items(&events))
    }

    /// Put a single full item.
    pub fn put_one(&self, item: T) -> Result<T> {
        self.put([PutRequest::Item(item)])?
            .pop()
            .ok_or_else(|| StoreError::InvalidOperation("put produced no item".to_string()))
    }

    /// Apply a single patch to an existing item.
    pub fn put_patch(&self, id: impl Into<ItemId>, patch: Patch) -> Result<T> {
        self.put([PutRequest::patch(id, patch)])?
            .pop()
            .ok_or_else(|| StoreError::InvalidOperation("patch produced no item".to_string()))
    }

    /// Remove items by id, re-indexing what follows each removal.
    pub fn delete(&self, ids: &[ItemId]) -> Result<Vec<ItemId>> {
        let requests: Vec<Request<T>> = ids.iter().cloned().map(Request::Delete).collect();
        let events = self.apply_requests(requests, false)?;
        Ok(events.iter().filter_map(Update::id).cloned().collect())
    }

    pub fn delete_one(&self, id: impl Into<ItemId>) -> Result<ItemId> {
        let id = id.into();
        self.delete(std::slice::from_ref(&id))?
            .pop()
            .ok_or(StoreError::NotFound(id))
    }

    /// Begin a transaction against this store's root.
    pub fn transaction(&self) -> Transaction<T> {
        Transaction::new(self.source_root())
    }

    /// Execute requests sequentially against the root storage under
    /// the write lock. With `batch`, events wrap into one `Batch`
    /// notification and failures report as `TransactionFailed`.
    /// Requests applied before a failure are not rolled back; their
    /// events are still delivered.
    pub(crate) fn apply_requests(
        &self,
        requests: Vec<Request<T>>,
        batch: bool,
    ) -> Result<Vec<Update<T>>> {
        if let Some(source) = self.source() {
            return source.apply_requests(requests, batch);
        }

        let _guard = self.inner.write_lock.lock();
        let mut events: Vec<Update<T>> = Vec::new();
        let mut failure: Option<(usize, StoreError)> = None;

        for (step, request) in requests.into_iter().enumerate() {
            let result = {
                let mut role = self.inner.role.write();
                match &mut *role {
                    Role::Root { storage } => match request {
                        Request::Add(item) => storage.add(item).map(|e| vec![e]),
                        Request::Put(put) => storage.put(put),
                        Request::Delete(id) => storage.delete(&id).map(|e| vec![e]),
                    },
                    Role::Derived { .. } => Err(StoreError::InvalidOperation(
                        "mutation reached a derived view".to_string(),
                    )),
                }
            };
            match result {
                Ok(new_events) => {
                    self.bump_version(new_events.len() as u64);
                    events.extend(new_events);
                }
                Err(e) => {
                    failure = Some((step, e));
                    break;
                }
            }
        }

        let notification: Vec<Update<T>> = if batch && !events.is_empty() {
            vec![Update::Batch(events.clone())]
        } else {
            events.clone()
        };
        if !notification.is_empty() {
            self.notify(&notification);
        }

        match failure {
            None => Ok(events),
            Some((step, e)) if batch => Err(StoreError::TransactionFailed {
                step,
                source: Box::new(e),
            }),
            Some((_, e)) => Err(e),
        }
    }

    // --- Live tracking ---

    /// Enable live-tracking mode: subscribe to the source's mutation
    /// events, materialize data and id map now, and maintain both
    /// incrementally as events arrive. A root store is already
    /// authoritative; tracking it is a no-op.
    pub fn track(&self) -> Result<Store<T>> {
        let source = {
            let mut role = self.inner.role.write();
            match &mut *role {
                Role::Root { .. } => return Ok(self.clone()),
                Role::Derived { live: true, .. } => return Ok(self.clone()),
                Role::Derived { source, live } => {
                    *live = true;
                    source.clone()
                }
            }
        };
        source.register_tracker(Arc::downgrade(&self.inner));
        self.recompute(&source, true)?;
        debug!("view is now live");
        Ok(self.clone())
    }

    /// Detach from the source: perform a final fetch, deep-copy the
    /// data into local ownership, unsubscribe from source events, and
    /// become an independent root over the frozen snapshot. Returns
    /// the data.
    pub fn release(&self) -> Result<Vec<T>> {
        let data = self.fetch()?;
        let mut role = self.inner.role.write();
        let source = match &*role {
            Role::Root { .. } => {
                return Err(StoreError::InvalidOperation(
                    "release on a root store".to_string(),
                ))
            }
            Role::Derived { source, .. } => source.clone(),
        };
        source.unregister_tracker(&self.inner);

        let storage = MemoryStorage::with_items(Arc::clone(&self.inner.identity), data.clone())?;
        *role = Role::Root {
            storage: Box::new(storage),
        };
        drop(role);

        let mut cache = self.inner.cache.write();
        cache.data.clear();
        cache.map.clear();
        cache.synced = false;
        debug!(len = data.len(), "view released into a root snapshot");
        Ok(data)
    }

    // --- Subscriptions ---

    /// Subscribe through a bounded channel. Each received message is
    /// the ordered event batch of one logical operation. Only roots
    /// and live views emit events.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<T> {
        self.inner.subscriptions.subscribe(config)
    }

    /// Register a callback subscriber, invoked inline with each event
    /// batch. The callback runs while the store's write lock is held
    /// and must not mutate the store synchronously.
    pub fn observe(&self, callback: impl Fn(&[Update<T>]) + Send + Sync + 'static) -> SubscriptionId {
        self.inner.subscriptions.observe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.subscriptions.unsubscribe(id)
    }

    // --- Internals ---

    fn source(&self) -> Option<Store<T>> {
        match &*self.inner.role.read() {
            Role::Root { .. } => None,
            Role::Derived { source, .. } => Some(source.clone()),
        }
    }

    /// This store if it is a root, otherwise its ultimate source.
    fn source_root(&self) -> Store<T> {
        self.source().unwrap_or_else(|| self.clone())
    }

    fn bump_version(&self, n: u64) {
        self.inner.cache.write().version += n;
    }

    fn register_tracker(&self, tracker: Weak<StoreInner<T>>) {
        self.inner.trackers.lock().push(tracker);
    }

    fn unregister_tracker(&self, tracker: &Arc<StoreInner<T>>) {
        self.inner
            .trackers
            .lock()
            .retain(|weak| !std::ptr::eq(weak.as_ptr(), Arc::as_ptr(tracker)));
    }

    /// Deliver one logical operation's events to subscribers and to
    /// every live view of this store.
    fn notify(&self, events: &[Update<T>]) {
        trace!(events = events.len(), "dispatching mutation events");
        self.inner.subscriptions.notify(events);

        let trackers: Vec<Arc<StoreInner<T>>> = {
            let mut list = self.inner.trackers.lock();
            list.retain(|weak| weak.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };
        for tracker in trackers {
            Store { inner: tracker }.apply_source_events(events);
        }
    }

    /// Split the query list into the body and the maximal suffix of
    /// trailing ranges, which are applied at materialization time.
    fn trailing_range_split(&self) -> (&[Query<T>], &[Query<T>]) {
        let queries = &self.inner.queries;
        let mut split = queries.len();
        while split > 0 && matches!(queries[split - 1], Query::Range(_)) {
            split -= 1;
        }
        queries.split_at(split)
    }

    /// Apply trailing ranges to the cached sequence.
    fn materialize(&self, data: &[T]) -> Vec<T> {
        let (_, ranges) = self.trailing_range_split();
        let mut out = data.to_vec();
        for query in ranges {
            out = query.apply(&out);
        }
        out
    }

    /// Recompute the cache from the source's current data and return
    /// the materialized result.
    fn recompute(&self, source: &Store<T>, live: bool) -> Result<Vec<T>> {
        let source_version = source.version();
        let mut data = source.fetch()?;
        let (body, _) = self.trailing_range_split();
        for query in body {
            data = query.apply(&data);
        }
        debug!(
            version = source_version,
            len = data.len(),
            "recomputed view cache"
        );

        let mut cache = self.inner.cache.write();
        cache.map = if live {
            IdMap::rebuild(&data, self.inner.identity.as_ref())?
        } else {
            IdMap::new()
        };
        cache.data = data;
        cache.version = source_version;
        cache.synced = true;
        Ok(self.materialize(&cache.data))
    }

    /// True when source events can be applied to the cache exactly:
    /// every Range sits at the end of the query list. A window earlier
    /// in the list depends on items outside the cached sequence, so
    /// those views recompute instead.
    fn incrementally_maintainable(&self) -> bool {
        let (body, _) = self.trailing_range_split();
        !body.iter().any(|query| matches!(query, Query::Range(_)))
    }

    fn matches_filters(&self, item: &T) -> bool {
        let (body, _) = self.trailing_range_split();
        body.iter().all(|query| match query {
            Query::Filter(filter) => filter.matches(item),
            _ => true,
        })
    }

    fn sorts(&self) -> Vec<&Sort<T>> {
        let (body, _) = self.trailing_range_split();
        body.iter()
            .filter_map(|query| match query {
                Query::Sort(sort) => Some(sort),
                _ => None,
            })
            .collect()
    }

    /// Position a new item belongs at under this view's sorts. Later
    /// sorts are the major keys (each pass is stable); ties keep
    /// arrival order by inserting after equals.
    fn insertion_index(&self, data: &[T], item: &T) -> usize {
        let sorts = self.sorts();
        if sorts.is_empty() {
            return data.len();
        }
        data.partition_point(|existing| {
            for sort in sorts.iter().rev() {
                match sort.compare(existing, item) {
                    Ordering::Equal => continue,
                    other => return other != Ordering::Greater,
                }
            }
            true
        })
    }

    /// Replay source events into this live view's cache, then re-emit
    /// the view-localized events to its own subscribers. The version
    /// advances by the number of source mutations, staying in
    /// lock-step with the source without a refetch.
    fn apply_source_events(&self, events: &[Update<T>]) {
        let total = count_events(events) as u64;
        if total == 0 {
            return;
        }

        let synced = self.inner.cache.read().synced;
        if !synced || !self.incrementally_maintainable() {
            // Forwarded events keep their source-relative indices here;
            // the cache itself is refreshed wholesale.
            if let Err(e) = self.refresh_from_source() {
                debug!(error = %e, "live view refresh failed");
                return;
            }
            self.inner.subscriptions.notify(events);
            return;
        }

        let mut local: Vec<Update<T>> = Vec::new();
        {
            let mut cache = self.inner.cache.write();
            for event in events {
                self.apply_one(&mut cache, event, &mut local);
            }
            cache.version += total;
        }

        if !local.is_empty() {
            self.inner.subscriptions.notify(&local);
        }
    }

    fn refresh_from_source(&self) -> Result<()> {
        let (source, live) = match &*self.inner.role.read() {
            Role::Root { .. } => return Ok(()),
            Role::Derived { source, live } => (source.clone(), *live),
        };
        self.recompute(&source, live).map(|_| ())
    }

    fn insert_into_cache(&self, cache: &mut ViewCache<T>, id: &ItemId, item: &T) -> usize {
        let index = self.insertion_index(&cache.data, item);
        cache.map.shift_for_insert(index);
        cache.data.insert(index, item.clone());
        cache.map.insert(id.clone(), index);
        index
    }

    fn remove_from_cache(&self, cache: &mut ViewCache<T>, id: &ItemId, index: usize) {
        cache.data.remove(index);
        cache.map.remove(id);
        cache.map.shift_for_removal(index);
    }

    fn apply_one(&self, cache: &mut ViewCache<T>, event: &Update<T>, out: &mut Vec<Update<T>>) {
        match event {
            Update::Batch(inner) => {
                let mut nested = Vec::new();
                for event in inner {
                    self.apply_one(cache, event, &mut nested);
                }
                if !nested.is_empty() {
                    out.push(Update::Batch(nested));
                }
            }
            Update::Added { id, item, .. } => {
                if !self.matches_filters(item) {
                    return;
                }
                let index = self.insert_into_cache(cache, id, item);
                out.push(Update::Added {
                    id: id.clone(),
                    item: item.clone(),
                    index,
                });
            }
            Update::Deleted { id, .. } => {
                if let Some(index) = cache.map.get(id) {
                    self.remove_from_cache(cache, id, index);
                    out.push(Update::Deleted {
                        id: id.clone(),
                        previous_index: index,
                    });
                }
            }
            Update::Updated { id, item, diff, .. } => {
                let present = cache.map.get(id);
                let matches = self.matches_filters(item);
                let (previous_index, index) = match (present, matches) {
                    (Some(old_index), true) => {
                        if self.sorts().is_empty() {
                            cache.data[old_index] = item.clone();
                            (Some(old_index), Some(old_index))
                        } else {
                            self.remove_from_cache(cache, id, old_index);
                            let index = self.insert_into_cache(cache, id, item);
                            (Some(old_index), Some(index))
                        }
                    }
                    (Some(old_index), false) => {
                        self.remove_from_cache(cache, id, old_index);
                        (Some(old_index), None)
                    }
                    (None, true) => {
                        let index = self.insert_into_cache(cache, id, item);
                        (None, Some(index))
                    }
                    (None, false) => return,
                };
                out.push(Update::Updated {
                    id: id.clone(),
                    item: item.clone(),
                    diff: diff.clone(),
                    previous_index,
                    index,
                });
            }
        }
    }
}

/// Extract the resulting items from mutation events, batches
/// flattened.
fn collect_items<T: Clone>(events: &[Update<T>]) -> Vec<T> {
    let mut out = Vec::new();
    for event in events {
        match event {
            Update::Added { item, .. } | Update::Updated { item, .. } => out.push(item.clone()),
            Update::Deleted { .. } => {}
            Update::Batch(inner) => out.extend(collect_items(inner)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn seeded() -> Store<Value> {
        Store::memory_with(vec![
            json!({"id": "1", "v": 1}),
            json!({"id": "2", "v": 2}),
        ])
        .unwrap()
    }

    #[test]
    fn test_add_then_get() {
        let store = seeded();
        store.add_one(json!({"id": "3", "v": 3})).unwrap();

        let item = store.get_one("3").unwrap();
        assert_eq!(item, json!({"id": "3", "v": 3}));
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_version_increments_per_mutation() {
        let store = seeded();
        assert_eq!(store.version(), 0);

        store
            .add(vec![json!({"id": "3"}), json!({"id": "4"})])
            .unwrap();
        assert_eq!(store.version(), 2);

        store.delete_one("3").unwrap();
        assert_eq!(store.version(), 3);
    }

    #[test]
    fn test_derived_fetch_recomputes_when_stale() {
        let store = seeded();
        let view = store.filter(Filter::gt("v", 1));

        assert_eq!(view.fetch().unwrap().len(), 1);

        store.add_one(json!({"id": "3", "v": 5})).unwrap();
        assert_eq!(view.fetch().unwrap().len(), 2);
        assert_eq!(view.version(), store.version());
    }

    #[test]
    fn test_views_share_the_ultimate_source() {
        let store = seeded();
        let chained = store
            .filter(Filter::gt("v", 0))
            .sort(Sort::by("v"))
            .range(0, 1);

        assert_eq!(chained.queries().len(), 3);
        // mutating through the deepest view reaches the root
        chained.add_one(json!({"id": "9", "v": 0})).unwrap();
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn test_mutation_forwards_to_source() {
        let store = seeded();
        let view = store.filter(Filter::gt("v", 0));

        view.put_patch("1", Patch::new().set("v", 9)).unwrap();
        assert_eq!(store.get_one("1").unwrap()["v"], 9);
    }

    #[test]
    fn test_release_freezes_a_snapshot() {
        let store = seeded();
        let view = store.filter(Filter::gt("v", 1));
        let data = view.release().unwrap();
        assert_eq!(data.len(), 1);

        // further source mutations no longer affect the released store
        store.add_one(json!({"id": "3", "v": 3})).unwrap();
        assert_eq!(view.fetch().unwrap().len(), 1);
        assert!(!view.is_derived());

        // and it accepts its own writes now
        view.add_one(json!({"id": "x", "v": 10})).unwrap();
        assert_eq!(view.len().unwrap(), 2);
    }

    #[test]
    fn test_release_on_root_is_rejected() {
        let store = seeded();
        assert!(matches!(
            store.release(),
            Err(StoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_get_forwards_to_source() {
        let store = seeded();
        let view = store.filter(Filter::eq("v", 2));
        // "1" is filtered out of the view but get still resolves it
        assert_eq!(view.get_one("1").unwrap()["v"], 1);
    }

    #[test]
    fn test_query_string_of_view() {
        let store = seeded();
        let view = store.filter(Filter::gt("v", 1)).sort(Sort::by_desc("v"));
        assert_eq!(view.query_string().unwrap(), "gt(v,1)&sort(-v)");
    }
}
