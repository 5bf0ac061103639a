//! # Prism
//!
//! An in-process, versioned, queryable collection store: a generic
//! engine holding uniquely-identified records, with composable
//! filter/sort/range views, patch-based partial updates, and typed
//! mutation events propagated live into derived views.
//!
//! ## Core Concepts
//!
//! - **Store**: versioned ordered data plus an id map, root or derived
//! - **Queries**: immutable filter/sort/range transforms, composable
//! - **Patches**: ordered structural diffs, applicable and mergeable
//! - **Tracking**: live views maintained from events, not refetches
//!
//! ## Example
//!
//! ```ignore
//! use prism::{Filter, Patch, Sort, Store};
//! use serde_json::json;
//!
//! let store = Store::memory_with(vec![
//!     json!({"id": "1", "v": 1}),
//!     json!({"id": "2", "v": 2}),
//! ])?;
//!
//! // Derive a live view
//! let view = store.filter(Filter::gt("v", 1)).sort(Sort::by("v")).track()?;
//!
//! // Patch an item; the view updates incrementally
//! store.put_patch("1", Patch::new().set("v", 9))?;
//! assert_eq!(view.fetch()?.len(), 2);
//! ```

pub mod error;
pub mod patch;
pub mod path;
pub mod query;
pub mod storage;
pub mod store;
pub mod subscriptions;
pub mod transaction;
pub mod types;

// Re-exports
pub use error::{Result, StoreError};
pub use patch::{Patch, PatchOp};
pub use path::{PathSegment, PropertyPath};
pub use query::{CompareOp, Filter, Query, QuerySerializer, Range, RqlSerializer, Sort};
pub use storage::{MemoryStorage, Storage};
pub use store::Store;
pub use subscriptions::{
    SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, SubscriptionId,
    SubscriptionManager, Update,
};
pub use transaction::Transaction;
pub use types::{FieldIdentity, IdMap, Identity, IndexedEntry, Item, ItemId, PutRequest};
