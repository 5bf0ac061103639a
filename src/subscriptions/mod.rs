//! Update propagation: typed mutation events and in-process
//! subscriptions.
//!
//! Every successful mutation produces an ordered batch of `Update`
//! events. The batch is broadcast to local subscribers (bounded
//! channels or inline callbacks) and replayed into live derived views,
//! which apply it incrementally instead of re-fetching.
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe(SubscriptionConfig::default());
//! store.add_one(json!({"id": "1", "v": 1}))?;
//!
//! let events = handle.recv()?;
//! assert!(matches!(events[0], Update::Added { .. }));
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    count_events, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, SubscriptionId,
    Update,
};
