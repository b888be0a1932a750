//! Caller-side UI state folded from the pairing event stream.
//!
//! The coordinators never touch UI state. A caller owns a [`PairingView`]
//! and feeds it every [`PairingEvent`] it receives.

use std::collections::BTreeMap;

use tandem_common::{Pose, StrokeId};

use crate::pairing::{FailureReason, PairingEvent, PairingPhase, Role};
use crate::strokes::{PartnerStroke, StrokeHandle};

/// What the pair button should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    /// Start pairing.
    Unpaired,
    /// Pairing in progress; pressing cancels.
    Pairing,
    /// Synced; pressing leaves the room.
    Connected,
    /// No network.
    Disabled,
}

/// UI state for one device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairingView {
    pub phase: PairingPhase,
    pub role: Role,
    pub partner_connected: bool,
    pub anchor_pose: Option<Pose>,
    pub local_strokes: BTreeMap<StrokeHandle, StrokeId>,
    pub partner_strokes: BTreeMap<StrokeId, PartnerStroke>,
    pub last_failure: Option<FailureReason>,
    pub offline: bool,
    pub anchor_was_reset: bool,
}

impl PairingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the view.
    pub fn apply(&mut self, event: &PairingEvent) {
        match event {
            PairingEvent::PhaseChanged(phase) => {
                self.phase = *phase;
                match phase {
                    PairingPhase::Idle => {
                        self.role = Role::Unassigned;
                        self.partner_connected = false;
                        self.anchor_pose = None;
                        self.offline = false;
                    }
                    PairingPhase::Offline => self.offline = true,
                    PairingPhase::Looking => {
                        self.last_failure = None;
                        self.anchor_was_reset = false;
                    }
                    _ => {}
                }
            }
            PairingEvent::RoleAssigned(role) => self.role = *role,
            PairingEvent::PartnerJoined => self.partner_connected = true,
            PairingEvent::PartnerLost => self.partner_connected = false,
            PairingEvent::AnchorReadyToCreate => {}
            PairingEvent::AnchorResolved { pose } => self.anchor_pose = Some(*pose),
            PairingEvent::AnchorWasReset => {
                self.anchor_pose = None;
                self.anchor_was_reset = true;
                self.partner_strokes.clear();
                self.local_strokes.clear();
            }
            PairingEvent::LocalStrokeAdded { handle, id } => {
                self.local_strokes.insert(*handle, id.clone());
            }
            PairingEvent::LocalStrokeRemoved { handle, .. } => {
                self.local_strokes.remove(handle);
            }
            PairingEvent::PartnerStrokeAdded(stroke) => {
                self.partner_strokes.insert(stroke.id.clone(), stroke.clone());
            }
            PairingEvent::PartnerStrokeUpdated { id, points } => {
                if let Some(stroke) = self.partner_strokes.get_mut(id) {
                    stroke.points = points.clone();
                }
            }
            PairingEvent::PartnerStrokeRemoved { id } => {
                self.partner_strokes.remove(id);
            }
            PairingEvent::PairingFailed { reason } => self.last_failure = Some(reason.clone()),
            PairingEvent::OfflineDetected => self.offline = true,
        }
    }

    pub fn button(&self) -> ButtonState {
        match self.phase {
            PairingPhase::Offline => ButtonState::Disabled,
            PairingPhase::Idle => ButtonState::Unpaired,
            PairingPhase::Synced => ButtonState::Connected,
            phase if phase.is_error() => ButtonState::Unpaired,
            _ => ButtonState::Pairing,
        }
    }

    /// Instruction shown to the user for the current phase.
    pub fn message(&self) -> &'static str {
        match self.phase {
            PairingPhase::Idle if self.anchor_was_reset => {
                "The drawing was cleared. Pair again to keep drawing."
            }
            PairingPhase::Idle => "Tap pair to draw with a friend.",
            PairingPhase::Offline => "No connection. Check your network.",
            PairingPhase::Looking => "Looking for a nearby partner...",
            PairingPhase::Connected(Role::Host) | PairingPhase::Connected(Role::Partner) => {
                "Partner found. Point both devices at the same spot and tap ready."
            }
            PairingPhase::Connected(Role::Unassigned) => "Partner found. Setting up the room...",
            PairingPhase::HostReadyAndWaiting => "Waiting for your partner to be ready...",
            PairingPhase::PartnerReadyAndWaiting => "Waiting for your partner to set the anchor...",
            PairingPhase::HostConnecting => "Setting the shared anchor. Hold still.",
            PairingPhase::PartnerConnecting | PairingPhase::GlobalConnecting => {
                "Finding the shared anchor. Hold still."
            }
            PairingPhase::Synced => "Connected. Start drawing!",
            PairingPhase::DiscoveryTimeout => "No partner found nearby. Try again.",
            PairingPhase::ConnectionLost => "Your partner left. Try pairing again.",
            PairingPhase::HostAnchorError => "Couldn't set the anchor. Try again.",
            PairingPhase::HostResolveError | PairingPhase::PartnerResolveError => {
                "Couldn't find the shared anchor. Try again."
            }
            PairingPhase::GlobalResolveError => "Couldn't find the room's anchor. Try again.",
            PairingPhase::GlobalNoAnchor => "This room has no anchor yet.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AnchorFailure;
    use crate::strokes::StrokeStyle;
    use tandem_common::Point3;

    fn partner_stroke(id: &str) -> PartnerStroke {
        PartnerStroke {
            id: StrokeId::from(id),
            points: vec![Point3::new(0.0, 0.0, 0.0)],
            style: StrokeStyle::default(),
            creator: None,
        }
    }

    #[test]
    fn follows_a_successful_session() {
        let mut view = PairingView::new();
        assert_eq!(view.button(), ButtonState::Unpaired);

        view.apply(&PairingEvent::PhaseChanged(PairingPhase::Looking));
        assert_eq!(view.button(), ButtonState::Pairing);

        view.apply(&PairingEvent::PartnerJoined);
        view.apply(&PairingEvent::RoleAssigned(Role::Host));
        view.apply(&PairingEvent::PhaseChanged(PairingPhase::Connected(Role::Host)));
        assert!(view.partner_connected);
        assert_eq!(view.role, Role::Host);

        view.apply(&PairingEvent::AnchorResolved {
            pose: Pose::identity(),
        });
        view.apply(&PairingEvent::PhaseChanged(PairingPhase::Synced));
        assert_eq!(view.button(), ButtonState::Connected);
        assert_eq!(view.anchor_pose, Some(Pose::identity()));
        assert_eq!(view.message(), "Connected. Start drawing!");
    }

    #[test]
    fn tracks_partner_strokes() {
        let mut view = PairingView::new();
        view.apply(&PairingEvent::PartnerStrokeAdded(partner_stroke("s1")));
        view.apply(&PairingEvent::PartnerStrokeUpdated {
            id: StrokeId::from("s1"),
            points: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
        });
        assert_eq!(view.partner_strokes[&StrokeId::from("s1")].points.len(), 2);

        view.apply(&PairingEvent::PartnerStrokeRemoved {
            id: StrokeId::from("s1"),
        });
        assert!(view.partner_strokes.is_empty());
    }

    #[test]
    fn update_for_unknown_partner_stroke_is_ignored() {
        let mut view = PairingView::new();
        view.apply(&PairingEvent::PartnerStrokeUpdated {
            id: StrokeId::from("ghost"),
            points: Vec::new(),
        });
        assert!(view.partner_strokes.is_empty());
    }

    #[test]
    fn tracks_local_strokes() {
        let mut view = PairingView::new();
        let handle = StrokeHandle::new();
        view.apply(&PairingEvent::LocalStrokeAdded {
            handle,
            id: StrokeId::from("s2"),
        });
        assert_eq!(view.local_strokes.len(), 1);
        view.apply(&PairingEvent::LocalStrokeRemoved {
            handle,
            id: StrokeId::from("s2"),
        });
        assert!(view.local_strokes.is_empty());
    }

    #[test]
    fn failure_is_remembered_until_next_attempt() {
        let mut view = PairingView::new();
        view.apply(&PairingEvent::PairingFailed {
            reason: FailureReason::HostFailed(AnchorFailure::NotTracking),
        });
        view.apply(&PairingEvent::PhaseChanged(PairingPhase::HostAnchorError));
        assert_eq!(view.button(), ButtonState::Unpaired);
        assert!(view.last_failure.is_some());

        view.apply(&PairingEvent::PhaseChanged(PairingPhase::Looking));
        assert!(view.last_failure.is_none());
    }

    #[test]
    fn offline_disables_the_button() {
        let mut view = PairingView::new();
        view.apply(&PairingEvent::OfflineDetected);
        view.apply(&PairingEvent::PhaseChanged(PairingPhase::Offline));
        assert!(view.offline);
        assert_eq!(view.button(), ButtonState::Disabled);

        view.apply(&PairingEvent::PhaseChanged(PairingPhase::Idle));
        assert!(!view.offline);
    }

    #[test]
    fn anchor_reset_clears_drawing() {
        let mut view = PairingView::new();
        view.apply(&PairingEvent::PartnerStrokeAdded(partner_stroke("s1")));
        view.apply(&PairingEvent::AnchorWasReset);
        view.apply(&PairingEvent::PhaseChanged(PairingPhase::Idle));
        assert!(view.partner_strokes.is_empty());
        assert_eq!(
            view.message(),
            "The drawing was cleared. Pair again to keep drawing."
        );
    }
}
