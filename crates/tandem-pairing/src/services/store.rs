//! Tree-structured replicated store.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use tandem_common::ParticipantId;

/// Handle of an active observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Correlates a write or read with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    /// Allocate a process-unique request id.
    pub fn next() -> Self {
        Self(REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveKind {
    /// Per-child added/changed/removed events.
    Children,
    /// Whole-value snapshots.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildChange {
    Added,
    Changed,
    Removed,
}

/// Callbacks from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The store finished signing in and can be written.
    Ready,
    Child {
        subscription: SubscriptionId,
        change: ChildChange,
        key: String,
        value: Value,
    },
    Value {
        subscription: SubscriptionId,
        value: Option<Value>,
    },
    ReadCompleted {
        request: RequestId,
        result: Result<Option<Value>, String>,
    },
    WriteCompleted {
        request: RequestId,
        result: Result<(), String>,
    },
    /// The store revoked an observation.
    Cancelled {
        subscription: SubscriptionId,
        reason: String,
    },
}

/// Replicated store client.
///
/// Paths are `/`-separated. Writing `None` removes the subtree. Writes
/// to one path are observed in issue order.
pub trait RoomStore: Send {
    fn is_ready(&self) -> bool;

    /// This device's identity in the store, once signed in.
    fn local_id(&self) -> Option<ParticipantId>;

    /// A fresh, time-ordered unique key for a new child of `parent`.
    fn child_key(&mut self, parent: &str) -> String;

    fn write(&mut self, path: &str, value: Option<Value>, request: Option<RequestId>);

    /// Write several children of `path` at once. Keys may contain `/`.
    fn update(&mut self, path: &str, children: Map<String, Value>, request: Option<RequestId>);

    fn read_once(&mut self, path: &str, request: RequestId);

    fn observe(&mut self, path: &str, kind: ObserveKind) -> SubscriptionId;

    fn unobserve(&mut self, subscription: SubscriptionId);

    /// Remove `path` when this device disconnects from the store.
    fn remove_on_disconnect(&mut self, path: &str);
}
