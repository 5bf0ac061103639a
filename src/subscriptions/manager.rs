//! Subscription manager for broadcasting mutation events.

use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, SubscriptionId, Update,
};

/// How events reach a subscriber: a bounded channel, or a callback
/// invoked inline.
enum Delivery<T> {
    Channel(Sender<Vec<Update<T>>>),
    Callback(Arc<dyn Fn(&[Update<T>]) + Send + Sync>),
}

/// Internal subscription state.
struct Subscription<T> {
    filter: SubscriptionFilter,
    delivery: Delivery<T>,
}

impl<T: Clone> Subscription<T> {
    /// Deliver a notification. Returns false if the subscriber is gone
    /// or its buffer is full (it will be dropped).
    fn deliver(&self, events: Vec<Update<T>>) -> bool {
        match &self.delivery {
            Delivery::Channel(sender) => sender.try_send(events).is_ok(),
            Delivery::Callback(callback) => {
                callback(&events);
                true
            }
        }
    }
}

/// Manages subscriptions and broadcasts event batches.
pub struct SubscriptionManager<T> {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription<T>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl<T: Clone> SubscriptionManager<T> {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a channel subscription. Returns a handle for receiving
    /// notifications.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<T> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size);

        self.subscriptions.write().insert(
            id,
            Subscription {
                filter: config.filter,
                delivery: Delivery::Channel(sender),
            },
        );

        SubscriptionHandle { id, receiver }
    }

    /// Register a callback subscriber, invoked inline with each event
    /// batch.
    pub fn observe(&self, callback: impl Fn(&[Update<T>]) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.subscriptions.write().insert(
            id,
            Subscription {
                filter: SubscriptionFilter::all(),
                delivery: Delivery::Callback(Arc::new(callback)),
            },
        );
        id
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.write().remove(&id);
    }

    /// Get subscription count.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Notify every matching subscriber with the ordered event batch of
    /// one logical operation. Subscribers that fail to receive are
    /// dropped.
    pub fn notify(&self, events: &[Update<T>]) {
        if events.is_empty() {
            return;
        }

        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                let matching: Vec<Update<T>> = events
                    .iter()
                    .filter(|e| sub.filter.matches(e))
                    .cloned()
                    .collect();
                if matching.is_empty() {
                    continue;
                }
                if !sub.deliver(matching) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                subs.remove(&id);
            }
        }
    }
}

impl<T: Clone> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}
