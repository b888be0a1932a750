//! Room discovery policies.
//!
//! Peer-paired rooms and the shared global room differ in how a room is
//! located and in a handful of anchor-record rules. Each variant is one
//! implementation of [`RoomDiscoveryPolicy`], chosen when a session starts.

use std::fmt;

use tandem_config::RoomMode;

use crate::pairing::{PairingPhase, Role};

/// How the room for a session is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEntry {
    /// Create a candidate room and negotiate with the discovered peer.
    CreateCandidate,
    /// Read the well-known pointer and join the room it names.
    FindGlobal,
}

pub trait RoomDiscoveryPolicy: Send + fmt::Debug {
    fn mode(&self) -> RoomMode;

    fn entry(&self) -> RoomEntry;

    /// Whether peers are discovered over the nearby channel.
    fn uses_peer_discovery(&self) -> bool;

    /// Clear the anchor record before observing it.
    fn clear_anchor_before_observing(&self, pairing: bool) -> bool;

    /// Observe the anchor as soon as the room is joined.
    fn observe_anchor_on_join(&self, pairing: bool) -> bool;

    /// Publish this device's resolution failures to the room.
    fn publish_resolution_error(&self, pairing: bool) -> bool;

    /// Phase while the anchor handshake is in flight.
    fn connecting_phase(&self, role: Role, pairing: bool) -> PairingPhase;

    /// Phase after this device failed to resolve, or timed out.
    fn resolve_error_phase(&self, role: Role, pairing: bool) -> PairingPhase;

    /// Phase after the room's anchor record reported an error.
    fn anchor_error_phase(&self, role: Role, pairing: bool) -> PairingPhase {
        self.resolve_error_phase(role, pairing)
    }

    /// Phase when the room has no anchor to resolve, if that is terminal.
    fn missing_anchor_phase(&self, pairing: bool) -> Option<PairingPhase>;
}

fn paired_connecting_phase(role: Role) -> PairingPhase {
    match role {
        Role::Host => PairingPhase::HostConnecting,
        _ => PairingPhase::PartnerConnecting,
    }
}

fn paired_resolve_error_phase(role: Role) -> PairingPhase {
    match role {
        Role::Host => PairingPhase::HostResolveError,
        _ => PairingPhase::PartnerResolveError,
    }
}

// ---------------------------------------------------------------------------
// Peer-paired rooms
// ---------------------------------------------------------------------------

/// Two devices, two candidate rooms, one survives the tie-break.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerRoomPolicy;

impl RoomDiscoveryPolicy for PeerRoomPolicy {
    fn mode(&self) -> RoomMode {
        RoomMode::Paired
    }

    fn entry(&self) -> RoomEntry {
        RoomEntry::CreateCandidate
    }

    fn uses_peer_discovery(&self) -> bool {
        true
    }

    fn clear_anchor_before_observing(&self, _pairing: bool) -> bool {
        true
    }

    fn observe_anchor_on_join(&self, _pairing: bool) -> bool {
        false
    }

    fn publish_resolution_error(&self, _pairing: bool) -> bool {
        true
    }

    fn connecting_phase(&self, role: Role, _pairing: bool) -> PairingPhase {
        paired_connecting_phase(role)
    }

    fn resolve_error_phase(&self, role: Role, _pairing: bool) -> PairingPhase {
        paired_resolve_error_phase(role)
    }

    fn missing_anchor_phase(&self, _pairing: bool) -> Option<PairingPhase> {
        None
    }
}

// ---------------------------------------------------------------------------
// Global room
// ---------------------------------------------------------------------------

/// One well-known room shared by everyone.
///
/// Without pairing, a device joins and resolves whatever anchor the room
/// already holds; it never clears or flags that anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalRoomPolicy;

impl RoomDiscoveryPolicy for GlobalRoomPolicy {
    fn mode(&self) -> RoomMode {
        RoomMode::Global
    }

    fn entry(&self) -> RoomEntry {
        RoomEntry::FindGlobal
    }

    fn uses_peer_discovery(&self) -> bool {
        false
    }

    fn clear_anchor_before_observing(&self, pairing: bool) -> bool {
        pairing
    }

    fn observe_anchor_on_join(&self, pairing: bool) -> bool {
        !pairing
    }

    fn publish_resolution_error(&self, pairing: bool) -> bool {
        pairing
    }

    fn connecting_phase(&self, role: Role, pairing: bool) -> PairingPhase {
        if pairing {
            paired_connecting_phase(role)
        } else {
            PairingPhase::GlobalConnecting
        }
    }

    fn resolve_error_phase(&self, role: Role, pairing: bool) -> PairingPhase {
        if pairing {
            paired_resolve_error_phase(role)
        } else {
            PairingPhase::GlobalResolveError
        }
    }

    fn anchor_error_phase(&self, role: Role, pairing: bool) -> PairingPhase {
        if pairing {
            paired_resolve_error_phase(role)
        } else {
            PairingPhase::GlobalNoAnchor
        }
    }

    fn missing_anchor_phase(&self, pairing: bool) -> Option<PairingPhase> {
        (!pairing).then_some(PairingPhase::GlobalNoAnchor)
    }
}

/// The policy for a configured room mode.
pub fn policy_for(mode: RoomMode) -> Box<dyn RoomDiscoveryPolicy> {
    match mode {
        RoomMode::Paired => Box::new(PeerRoomPolicy),
        RoomMode::Global => Box::new(GlobalRoomPolicy),
    }
}
