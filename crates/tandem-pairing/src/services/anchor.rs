//! Remote anchor service and local AR tracking.

use tandem_common::Pose;

use crate::inbox::{Inbox, Input};

/// Why hosting or resolving an anchor failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnchorFailure {
    /// Reason code reported by the anchor service.
    #[error("anchor service error {0}")]
    Service(i32),
    /// Tracking was lost when the failure happened.
    #[error("device is not tracking")]
    NotTracking,
    /// No anchor session could be created.
    #[error("anchor session unavailable")]
    SessionUnavailable,
}

impl AnchorFailure {
    pub fn code(&self) -> &'static str {
        match self {
            AnchorFailure::Service(_) => "service_error",
            AnchorFailure::NotTracking => "not_tracking",
            AnchorFailure::SessionUnavailable => "session_unavailable",
        }
    }
}

/// Asynchronous result of a host or resolve request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorOutcome {
    Hosted { anchor_id: String, pose: Pose },
    HostFailed(AnchorFailure),
    Resolved { anchor_id: String, pose: Pose },
    ResolveFailed(AnchorFailure),
}

/// Where an anchor session delivers its outcomes.
///
/// Tagged with the epoch of the session it was handed to, so outcomes of
/// a replaced session are recognisable as stale.
#[derive(Debug, Clone)]
pub struct AnchorSink {
    inbox: Inbox,
    epoch: u64,
}

impl AnchorSink {
    pub fn new(inbox: Inbox, epoch: u64) -> Self {
        Self { inbox, epoch }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn post(&self, outcome: AnchorOutcome) {
        self.inbox.post(Input::Anchor {
            epoch: self.epoch,
            outcome,
        });
    }
}

/// Process-wide anchor service. Creates the single live session.
pub trait AnchorService: Send {
    fn create_session(
        &mut self,
        sink: AnchorSink,
    ) -> Result<Box<dyn AnchorSession>, AnchorFailure>;
}

/// One anchor-service session. Replaced, never shared.
pub trait AnchorSession: Send {
    /// Host `pose` and publish it under a fresh anchor id.
    fn host_anchor(&mut self, pose: Pose);

    /// Resolve `anchor_id` into a pose in the local frame.
    fn resolve_anchor(&mut self, anchor_id: &str);
}

/// The device's AR tracking state.
pub trait TrackingSource: Send {
    fn is_tracking(&self) -> bool;

    /// Pose to host as the shared anchor, if tracking allows it.
    fn anchor_pose(&self) -> Option<Pose>;
}
