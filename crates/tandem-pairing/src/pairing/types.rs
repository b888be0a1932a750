//! Roles, phases, commands and caller-facing events.

use std::fmt;

use tandem_common::{PairingError, Point3, Pose, StrokeId};
use tokio::time::Instant;

use crate::config::PairingConfig;
use crate::services::AnchorFailure;
use crate::strokes::{LocalStroke, PartnerStroke, StrokeHandle};

// ---------------------------------------------------------------------------
// Roles and phases
// ---------------------------------------------------------------------------

/// A device's role in a pairing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Unassigned,
    /// Creates and publishes the shared anchor.
    Host,
    /// Resolves the host's anchor.
    Partner,
}

/// Where a device is in the pairing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairingPhase {
    #[default]
    Idle,
    Offline,
    Looking,
    Connected(Role),
    HostReadyAndWaiting,
    PartnerReadyAndWaiting,
    HostConnecting,
    PartnerConnecting,
    GlobalConnecting,
    Synced,
    DiscoveryTimeout,
    ConnectionLost,
    HostAnchorError,
    HostResolveError,
    PartnerResolveError,
    GlobalResolveError,
    GlobalNoAnchor,
}

impl PairingPhase {
    /// Terminal failure phases of one attempt. Left by cancelling.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            PairingPhase::DiscoveryTimeout
                | PairingPhase::ConnectionLost
                | PairingPhase::HostAnchorError
                | PairingPhase::HostResolveError
                | PairingPhase::PartnerResolveError
                | PairingPhase::GlobalResolveError
                | PairingPhase::GlobalNoAnchor
        )
    }

    /// A session is underway or established.
    pub fn is_pairing_or_paired(&self) -> bool {
        !matches!(self, PairingPhase::Idle | PairingPhase::Offline) && !self.is_error()
    }

    /// The anchor handshake has been issued and the pairing deadline runs.
    pub fn is_connecting(&self) -> bool {
        matches!(
            self,
            PairingPhase::HostConnecting
                | PairingPhase::PartnerConnecting
                | PairingPhase::GlobalConnecting
        )
    }
}

impl fmt::Display for PairingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingPhase::Connected(role) => write!(f, "Connected({role:?})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Snapshot of a device's pairing state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PairingSession {
    pub role: Role,
    pub phase: PairingPhase,
    pub partner_ready_to_set_anchor: bool,
    pub local_ready_to_set_anchor: bool,
    pub discovery_deadline: Option<Instant>,
    pub pairing_deadline: Option<Instant>,
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Why a pairing attempt failed, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    DiscoveryTimeout,
    PairingTimeout,
    HostFailed(AnchorFailure),
    ResolveFailed(AnchorFailure),
    /// The partner reported it could not resolve the anchor.
    AnchorErrorReported,
    /// Retry requested but no anchor id is known.
    NoAnchor,
    /// The shared global room could not be located.
    GlobalRoomUnavailable,
    Transport(String),
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::DiscoveryTimeout => "discovery_timeout",
            FailureReason::PairingTimeout => "pairing_timeout",
            FailureReason::HostFailed(AnchorFailure::NotTracking)
            | FailureReason::ResolveFailed(AnchorFailure::NotTracking) => "not_tracking",
            FailureReason::HostFailed(_) => "anchor_host_failed",
            FailureReason::ResolveFailed(_) => "anchor_resolve_failed",
            FailureReason::AnchorErrorReported => "anchor_error_reported",
            FailureReason::NoAnchor => "no_anchor",
            FailureReason::GlobalRoomUnavailable => "global_room_unavailable",
            FailureReason::Transport(_) => "transport",
        }
    }

    /// The core error this failure reports, with deadlines taken from
    /// `config`.
    pub fn to_error(&self, config: &PairingConfig) -> PairingError {
        match self {
            FailureReason::DiscoveryTimeout => {
                PairingError::DiscoveryTimeout(config.discovery_timeout.as_secs())
            }
            FailureReason::PairingTimeout => {
                PairingError::PairingTimeout(config.pairing_timeout.as_secs())
            }
            FailureReason::HostFailed(failure) => PairingError::AnchorHost(failure.to_string()),
            FailureReason::ResolveFailed(failure) => {
                PairingError::AnchorResolve(failure.to_string())
            }
            FailureReason::AnchorErrorReported => {
                PairingError::AnchorResolve("partner could not resolve the anchor".into())
            }
            FailureReason::NoAnchor => PairingError::AnchorResolve("no anchor id known".into()),
            FailureReason::GlobalRoomUnavailable => {
                PairingError::Transport("global room pointer unavailable".into())
            }
            FailureReason::Transport(message) => PairingError::Transport(message.clone()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::HostFailed(failure) | FailureReason::ResolveFailed(failure) => {
                write!(f, "{}: {failure}", self.code())
            }
            FailureReason::Transport(message) => write!(f, "transport: {message}"),
            other => f.write_str(other.code()),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands and events
// ---------------------------------------------------------------------------

/// Caller requests, delivered through the inbox.
#[derive(Debug, Clone)]
pub enum Command {
    /// Start whichever entry the configured room mode selects.
    Begin,
    BeginPairing,
    BeginGlobalSession { with_pairing: bool },
    SetReadyToSetAnchor,
    RetryResolvingAnchor,
    CancelPairing,
    LeaveRoom,
    ResumeSession,
    SetGlobalRoomName(String),
    UpdateStroke { stroke: LocalStroke, remove: bool },
    ClearAllStrokes,
    Shutdown,
}

/// Lifecycle events for the caller (rendering and UI).
#[derive(Debug, Clone, PartialEq)]
pub enum PairingEvent {
    PhaseChanged(PairingPhase),
    RoleAssigned(Role),
    PartnerJoined,
    PartnerLost,
    /// Host only: both sides are ready, the anchor is being created.
    AnchorReadyToCreate,
    /// The shared frame is established at `pose`.
    AnchorResolved { pose: Pose },
    /// The room's anchor disappeared; the room was left.
    AnchorWasReset,
    LocalStrokeAdded { handle: StrokeHandle, id: StrokeId },
    LocalStrokeRemoved { handle: StrokeHandle, id: StrokeId },
    PartnerStrokeAdded(PartnerStroke),
    PartnerStrokeUpdated { id: StrokeId, points: Vec<Point3> },
    PartnerStrokeRemoved { id: StrokeId },
    PairingFailed { reason: FailureReason },
    OfflineDetected,
}
