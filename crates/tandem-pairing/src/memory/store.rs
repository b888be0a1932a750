//! In-memory replicated store.
//!
//! One [`MemoryStoreBackend`] holds the JSON tree shared by every device;
//! each device talks to it through its own [`MemoryStore`]. Observers are
//! notified by diffing their last snapshot after every mutation, and all
//! notifications and completions are posted to the observing device's
//! inbox, never delivered inline.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tandem_common::{now_millis, ParticipantId};
use tracing::debug;

use crate::inbox::{Inbox, Input};
use crate::services::{ChildChange, ObserveKind, RequestId, RoomStore, StoreEvent, SubscriptionId};

// ---------------------------------------------------------------------------
// JSON tree helpers
// ---------------------------------------------------------------------------

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn get_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments(path) {
        node = node.as_object()?.get(segment)?;
    }
    (!is_empty(node)).then_some(node)
}

fn set_at(node: &mut Value, path: &[&str], value: Option<&Value>) {
    let Some((head, rest)) = path.split_first() else {
        *node = value.cloned().unwrap_or(Value::Null);
        return;
    };
    if !node.is_object() {
        if value.is_none() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        set_at(child, rest, value);
        if is_empty(child) {
            map.remove(*head);
        }
    }
}

fn children_of(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Observer {
    device: u64,
    path: String,
    kind: ObserveKind,
    inbox: Inbox,
    last: Option<Value>,
}

impl Observer {
    fn post(&self, subscription: SubscriptionId, event: StoreEvent) {
        debug!(subscription = subscription.0, path = %self.path, "Store notification");
        self.inbox.post(Input::Store(event));
    }

    /// Emit the initial state for a fresh observation.
    fn prime(&mut self, subscription: SubscriptionId, root: &Value) {
        let current = get_at(root, &self.path).cloned();
        match self.kind {
            ObserveKind::Value => self.post(
                subscription,
                StoreEvent::Value {
                    subscription,
                    value: current.clone(),
                },
            ),
            ObserveKind::Children => {
                for (key, value) in children_of(current.as_ref()) {
                    self.post(
                        subscription,
                        StoreEvent::Child {
                            subscription,
                            change: ChildChange::Added,
                            key,
                            value,
                        },
                    );
                }
            }
        }
        self.last = current;
    }

    /// Emit whatever changed since the last snapshot.
    fn refresh(&mut self, subscription: SubscriptionId, root: &Value) {
        let current = get_at(root, &self.path).cloned();
        if current == self.last {
            return;
        }
        match self.kind {
            ObserveKind::Value => self.post(
                subscription,
                StoreEvent::Value {
                    subscription,
                    value: current.clone(),
                },
            ),
            ObserveKind::Children => {
                let old = children_of(self.last.as_ref());
                let new = children_of(current.as_ref());
                for (key, value) in &new {
                    let change = match old.get(key) {
                        None => ChildChange::Added,
                        Some(previous) if previous != value => ChildChange::Changed,
                        Some(_) => continue,
                    };
                    self.post(
                        subscription,
                        StoreEvent::Child {
                            subscription,
                            change,
                            key: key.clone(),
                            value: value.clone(),
                        },
                    );
                }
                for (key, value) in old {
                    if !new.contains_key(&key) {
                        self.post(
                            subscription,
                            StoreEvent::Child {
                                subscription,
                                change: ChildChange::Removed,
                                key,
                                value,
                            },
                        );
                    }
                }
            }
        }
        self.last = current;
    }
}

#[derive(Debug, Default)]
struct BackendState {
    root: Value,
    observers: BTreeMap<SubscriptionId, Observer>,
    on_disconnect: HashMap<u64, Vec<String>>,
    failing: HashSet<u64>,
    next_subscription: u64,
    next_device: u64,
    key_seq: u64,
}

impl BackendState {
    fn apply(&mut self, path: &str, value: Option<&Value>) {
        set_at(&mut self.root, &segments(path), value);
    }

    fn notify(&mut self) {
        let BackendState {
            root, observers, ..
        } = self;
        for (subscription, observer) in observers.iter_mut() {
            observer.refresh(*subscription, root);
        }
    }
}

/// The shared tree all simulated devices write to.
#[derive(Debug, Clone, Default)]
pub struct MemoryStoreBackend {
    inner: Arc<Mutex<BackendState>>,
}

impl MemoryStoreBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a device. `ready` is whether it starts signed in.
    pub fn connect(&self, participant: ParticipantId, inbox: Inbox, ready: bool) -> MemoryStore {
        let device = {
            let mut state = self.lock();
            state.next_device += 1;
            state.next_device
        };
        MemoryStore {
            backend: self.clone(),
            device,
            participant,
            inbox,
            ready: Arc::new(AtomicBool::new(ready)),
        }
    }

    /// Snapshot of the value at `path`.
    pub fn get(&self, path: &str) -> Option<Value> {
        get_at(&self.lock().root, path).cloned()
    }

    /// Write from outside any device, e.g. another client clearing a room.
    pub fn write(&self, path: &str, value: Option<Value>) {
        let mut state = self.lock();
        state.apply(path, value.as_ref());
        state.notify();
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }
}

// ---------------------------------------------------------------------------
// Per-device client
// ---------------------------------------------------------------------------

/// One device's connection to a [`MemoryStoreBackend`].
#[derive(Debug)]
pub struct MemoryStore {
    backend: MemoryStoreBackend,
    device: u64,
    participant: ParticipantId,
    inbox: Inbox,
    ready: Arc<AtomicBool>,
}

impl MemoryStore {
    /// A handle for driving this connection from a test or the simulator.
    pub fn control(&self) -> StoreControl {
        StoreControl {
            backend: self.backend.clone(),
            device: self.device,
            inbox: self.inbox.clone(),
            ready: Arc::clone(&self.ready),
        }
    }

    fn complete_write(&self, request: Option<RequestId>, result: Result<(), String>) {
        if let Some(request) = request {
            self.inbox
                .post(Input::Store(StoreEvent::WriteCompleted { request, result }));
        }
    }
}

impl RoomStore for MemoryStore {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn local_id(&self) -> Option<ParticipantId> {
        self.is_ready().then(|| self.participant.clone())
    }

    fn child_key(&mut self, _parent: &str) -> String {
        let mut state = self.backend.lock();
        state.key_seq += 1;
        format!("-{:013}{:06}", now_millis().max(0), state.key_seq)
    }

    fn write(&mut self, path: &str, value: Option<Value>, request: Option<RequestId>) {
        let result = {
            let mut state = self.backend.lock();
            if state.failing.contains(&self.device) {
                Err("permission denied".to_string())
            } else {
                state.apply(path, value.as_ref());
                state.notify();
                Ok(())
            }
        };
        self.complete_write(request, result);
    }

    fn update(&mut self, path: &str, children: Map<String, Value>, request: Option<RequestId>) {
        let result = {
            let mut state = self.backend.lock();
            if state.failing.contains(&self.device) {
                Err("permission denied".to_string())
            } else {
                for (key, value) in &children {
                    state.apply(&format!("{path}/{key}"), Some(value));
                }
                state.notify();
                Ok(())
            }
        };
        self.complete_write(request, result);
    }

    fn read_once(&mut self, path: &str, request: RequestId) {
        let value = self.backend.get(path);
        self.inbox.post(Input::Store(StoreEvent::ReadCompleted {
            request,
            result: Ok(value),
        }));
    }

    fn observe(&mut self, path: &str, kind: ObserveKind) -> SubscriptionId {
        let mut state = self.backend.lock();
        state.next_subscription += 1;
        let subscription = SubscriptionId(state.next_subscription);
        let mut observer = Observer {
            device: self.device,
            path: path.to_string(),
            kind,
            inbox: self.inbox.clone(),
            last: None,
        };
        observer.prime(subscription, &state.root);
        state.observers.insert(subscription, observer);
        subscription
    }

    fn unobserve(&mut self, subscription: SubscriptionId) {
        self.backend.lock().observers.remove(&subscription);
    }

    fn remove_on_disconnect(&mut self, path: &str) {
        let mut state = self.backend.lock();
        let paths = state.on_disconnect.entry(self.device).or_default();
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    }
}

/// Test and simulator controls for one device's store connection.
#[derive(Debug, Clone)]
pub struct StoreControl {
    backend: MemoryStoreBackend,
    device: u64,
    inbox: Inbox,
    ready: Arc<AtomicBool>,
}

impl StoreControl {
    /// Finish signing in and announce readiness.
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
        self.inbox.post(Input::Store(StoreEvent::Ready));
    }

    /// Mark ready without announcing it; only polling will notice.
    pub fn set_ready_silently(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent write from this device fail.
    pub fn fail_writes(&self, failing: bool) {
        let mut state = self.backend.lock();
        if failing {
            state.failing.insert(self.device);
        } else {
            state.failing.remove(&self.device);
        }
    }

    /// Drop the connection: run disconnect cleanup and end its observations.
    pub fn disconnect(&self) {
        self.ready.store(false, Ordering::SeqCst);
        let mut state = self.backend.lock();
        let device = self.device;
        state.observers.retain(|_, observer| observer.device != device);
        for path in state.on_disconnect.remove(&device).unwrap_or_default() {
            state.apply(&path, None);
        }
        state.notify();
    }
}
