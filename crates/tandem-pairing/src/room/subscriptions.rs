//! The active-subscription set.
//!
//! Subscriptions are owned tokens: acquired at most once per feed,
//! released exactly once, and all released together on leave. Events for
//! an id no longer in the set are stale and dropped by the caller.

use std::collections::HashMap;

use tracing::debug;

use super::types::Feed;
use crate::services::{ObserveKind, RoomStore, SubscriptionId};

#[derive(Debug, Default)]
pub(crate) struct Subscriptions {
    active: HashMap<SubscriptionId, Feed>,
}

impl Subscriptions {
    /// Observe `path` for `feed` unless that feed is already active.
    pub(crate) fn acquire(
        &mut self,
        store: &mut dyn RoomStore,
        feed: Feed,
        path: &str,
        kind: ObserveKind,
    ) -> Option<SubscriptionId> {
        if self.is_active(feed) {
            return None;
        }
        let subscription = store.observe(path, kind);
        debug!(subscription = subscription.0, ?feed, path, "Subscribed");
        self.active.insert(subscription, feed);
        Some(subscription)
    }

    pub(crate) fn is_active(&self, feed: Feed) -> bool {
        self.active.values().any(|f| *f == feed)
    }

    pub(crate) fn feed_of(&self, subscription: SubscriptionId) -> Option<Feed> {
        self.active.get(&subscription).copied()
    }

    pub(crate) fn release(&mut self, store: &mut dyn RoomStore, feed: Feed) {
        let ids: Vec<SubscriptionId> = self
            .active
            .iter()
            .filter(|(_, f)| **f == feed)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.active.remove(&id);
            store.unobserve(id);
        }
    }

    pub(crate) fn release_all(&mut self, store: &mut dyn RoomStore) {
        for (id, _) in self.active.drain() {
            store.unobserve(id);
        }
    }

    /// Drop a subscription the store already cancelled.
    pub(crate) fn forget(&mut self, subscription: SubscriptionId) -> Option<Feed> {
        self.active.remove(&subscription)
    }

    pub(crate) fn len(&self) -> usize {
        self.active.len()
    }
}
