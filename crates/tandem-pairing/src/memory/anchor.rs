//! In-memory anchor cloud and AR tracking.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tandem_common::Pose;
use tracing::debug;

use crate::services::{
    AnchorFailure, AnchorOutcome, AnchorService, AnchorSession, AnchorSink, TrackingSource,
};

#[derive(Debug, Default)]
struct CloudState {
    anchors: HashMap<String, Pose>,
    next_anchor: u64,
    host_failures: VecDeque<AnchorFailure>,
    resolve_failures: VecDeque<AnchorFailure>,
    sessions_created: usize,
    unavailable: bool,
}

/// The remote anchor service shared by simulated devices.
///
/// Failures can be queued up front; each queued failure is consumed by the
/// next matching request from any device.
#[derive(Debug, Clone, Default)]
pub struct MemoryAnchorCloud {
    inner: Arc<Mutex<CloudState>>,
}

impl MemoryAnchorCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CloudState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A per-device service handle.
    pub fn service(&self) -> MemoryAnchorService {
        MemoryAnchorService {
            cloud: self.clone(),
        }
    }

    pub fn fail_next_host(&self, failure: AnchorFailure) {
        self.lock().host_failures.push_back(failure);
    }

    pub fn fail_next_resolve(&self, failure: AnchorFailure) {
        self.lock().resolve_failures.push_back(failure);
    }

    /// Refuse to create sessions until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn sessions_created(&self) -> usize {
        self.lock().sessions_created
    }

    pub fn anchor_count(&self) -> usize {
        self.lock().anchors.len()
    }

    fn host(&self, pose: Pose) -> AnchorOutcome {
        let mut state = self.lock();
        if let Some(failure) = state.host_failures.pop_front() {
            return AnchorOutcome::HostFailed(failure);
        }
        state.next_anchor += 1;
        let anchor_id = format!("ua-{:04}", state.next_anchor);
        state.anchors.insert(anchor_id.clone(), pose);
        AnchorOutcome::Hosted { anchor_id, pose }
    }

    fn resolve(&self, anchor_id: &str) -> AnchorOutcome {
        let mut state = self.lock();
        if let Some(failure) = state.resolve_failures.pop_front() {
            return AnchorOutcome::ResolveFailed(failure);
        }
        match state.anchors.get(anchor_id) {
            Some(pose) => AnchorOutcome::Resolved {
                anchor_id: anchor_id.to_string(),
                pose: *pose,
            },
            None => AnchorOutcome::ResolveFailed(AnchorFailure::Service(-9)),
        }
    }
}

/// One device's anchor service.
#[derive(Debug, Clone)]
pub struct MemoryAnchorService {
    cloud: MemoryAnchorCloud,
}

impl AnchorService for MemoryAnchorService {
    fn create_session(
        &mut self,
        sink: AnchorSink,
    ) -> Result<Box<dyn AnchorSession>, AnchorFailure> {
        let mut state = self.cloud.lock();
        if state.unavailable {
            return Err(AnchorFailure::SessionUnavailable);
        }
        state.sessions_created += 1;
        debug!(epoch = sink.epoch(), "Anchor session created");
        Ok(Box::new(MemoryAnchorSession {
            cloud: self.cloud.clone(),
            sink,
        }))
    }
}

#[derive(Debug)]
struct MemoryAnchorSession {
    cloud: MemoryAnchorCloud,
    sink: AnchorSink,
}

impl AnchorSession for MemoryAnchorSession {
    fn host_anchor(&mut self, pose: Pose) {
        self.sink.post(self.cloud.host(pose));
    }

    fn resolve_anchor(&mut self, anchor_id: &str) {
        self.sink.post(self.cloud.resolve(anchor_id));
    }
}

// ---------------------------------------------------------------------------
// Tracking
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct TrackingState {
    tracking: bool,
    pose: Pose,
}

/// Shared, switchable tracking state for a simulated device.
#[derive(Debug, Clone)]
pub struct MemoryTracking {
    inner: Arc<Mutex<TrackingState>>,
}

impl Default for MemoryTracking {
    fn default() -> Self {
        Self::new(Pose::identity())
    }
}

impl MemoryTracking {
    pub fn new(pose: Pose) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TrackingState {
                tracking: true,
                pose,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackingState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_tracking(&self, tracking: bool) {
        self.lock().tracking = tracking;
    }

    pub fn set_pose(&self, pose: Pose) {
        self.lock().pose = pose;
    }
}

impl TrackingSource for MemoryTracking {
    fn is_tracking(&self) -> bool {
        self.lock().tracking
    }

    fn anchor_pose(&self) -> Option<Pose> {
        let state = self.lock();
        state.tracking.then_some(state.pose)
    }
}
