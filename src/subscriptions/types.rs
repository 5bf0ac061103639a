//! Event and subscription types for live store updates.

use crate::patch::Patch;
use crate::types::ItemId;
use serde::{Deserialize, Serialize};

/// A typed mutation event.
///
/// One logical operation produces one ordered sequence of these,
/// delivered to subscribers as a single notification. Transactions and
/// mixed add/update `put` calls wrap their constituent events in a
/// `Batch`, which is dispatched as one event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Update<T> {
    /// A new item was inserted at `index`.
    Added { id: ItemId, item: T, index: usize },

    /// An existing item changed. `diff` reconstructs the change;
    /// indices are `None` when the item left (or was never in) the
    /// observed sequence.
    Updated {
        id: ItemId,
        item: T,
        diff: Patch,
        previous_index: Option<usize>,
        index: Option<usize>,
    },

    /// An item was removed from `previous_index`.
    Deleted { id: ItemId, previous_index: usize },

    /// An ordered group of events from one transaction.
    Batch(Vec<Update<T>>),
}

impl<T> Update<T> {
    /// The id this event concerns; `None` for batches.
    pub fn id(&self) -> Option<&ItemId> {
        match self {
            Update::Added { id, .. } => Some(id),
            Update::Updated { id, .. } => Some(id),
            Update::Deleted { id, .. } => Some(id),
            Update::Batch(_) => None,
        }
    }

    /// Number of constituent mutations, batches flattened.
    pub fn count(&self) -> usize {
        match self {
            Update::Batch(events) => events.iter().map(Update::count).sum(),
            _ => 1,
        }
    }
}

/// Count the constituent mutations across an event sequence.
pub fn count_events<T>(events: &[Update<T>]) -> usize {
    events.iter().map(Update::count).sum()
}

/// Which event kinds a subscription wants. Batches are matched by
/// their contents.
#[derive(Clone, Copy, Debug)]
pub struct SubscriptionFilter {
    pub added: bool,
    pub updated: bool,
    pub deleted: bool,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl SubscriptionFilter {
    pub fn all() -> Self {
        Self {
            added: true,
            updated: true,
            deleted: true,
        }
    }

    pub fn matches<T>(&self, event: &Update<T>) -> bool {
        match event {
            Update::Added { .. } => self.added,
            Update::Updated { .. } => self.updated,
            Update::Deleted { .. } => self.deleted,
            Update::Batch(events) => events.iter().any(|e| self.matches(e)),
        }
    }
}

/// Configuration for a channel subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered notifications before the subscriber is dropped.
    /// Default: 1000
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: SubscriptionFilter::default(),
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to a channel subscription. Each received message is the full
/// ordered event batch of one logical operation.
pub struct SubscriptionHandle<T> {
    pub id: SubscriptionId,
    /// Channel to receive notifications.
    pub receiver: crossbeam_channel::Receiver<Vec<Update<T>>>,
}

impl<T> SubscriptionHandle<T> {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> Result<Vec<Update<T>>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notification (non-blocking).
    pub fn try_recv(&self) -> Result<Vec<Update<T>>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<Vec<Update<T>>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
