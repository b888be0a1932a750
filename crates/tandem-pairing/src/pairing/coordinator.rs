//! The top-level pairing state machine.

use std::collections::BTreeSet;

use tandem_common::PeerId;
use tandem_config::RoomMode;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::types::{Command, FailureReason, PairingEvent, PairingPhase, PairingSession, Role};
use crate::config::PairingConfig;
use crate::inbox::{Inbox, Input};
use crate::protocol::RoomData;
use crate::room::{
    GlobalRoomPolicy, PeerRoomPolicy, RoomCoordinator, RoomDiscoveryPolicy, RoomSignal,
};
use crate::services::{
    Advertisement, AnchorFailure, AnchorOutcome, AnchorService, AnchorSession, AnchorSink,
    DiscoveryChannel, DiscoveryEvent, RoomStore, TrackingSource,
};
use crate::strokes::StrokeEvent;
use crate::timer::{Timer, TimerKind};

/// The external collaborators one device pairs through.
pub struct Services {
    pub discovery: Box<dyn DiscoveryChannel>,
    pub anchors: Box<dyn AnchorService>,
    pub tracking: Box<dyn TrackingSource>,
    pub store: Box<dyn RoomStore>,
}

// ---------------------------------------------------------------------------
// Pairing Coordinator
// ---------------------------------------------------------------------------

/// Drives one device from "begin" to synced or failed.
///
/// Consumes [`Input`]s one at a time through [`PairingCoordinator::handle`]
/// and reports progress as [`PairingEvent`]s on the channel returned by
/// [`PairingCoordinator::new`].
pub struct PairingCoordinator {
    config: PairingConfig,
    inbox: Inbox,

    discovery: Box<dyn DiscoveryChannel>,
    anchors: Box<dyn AnchorService>,
    anchor_session: Option<Box<dyn AnchorSession>>,
    anchor_epoch: u64,
    tracking: Box<dyn TrackingSource>,
    room: RoomCoordinator,

    session: PairingSession,
    discovery_timer: Timer,
    pairing_timer: Timer,
    peers: BTreeSet<PeerId>,
    pending_peers: BTreeSet<PeerId>,
    reachable: bool,
    partner_announced: bool,

    events: mpsc::UnboundedSender<PairingEvent>,
}

impl PairingCoordinator {
    pub fn new(
        config: PairingConfig,
        services: Services,
        inbox: Inbox,
    ) -> (Self, mpsc::UnboundedReceiver<PairingEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let room = RoomCoordinator::new(config.clone(), services.store, inbox.clone());
        let mut coordinator = Self {
            config,
            inbox,
            discovery: services.discovery,
            anchors: services.anchors,
            anchor_session: None,
            anchor_epoch: 0,
            tracking: services.tracking,
            room,
            session: PairingSession::default(),
            discovery_timer: Timer::new(TimerKind::Discovery),
            pairing_timer: Timer::new(TimerKind::Pairing),
            peers: BTreeSet::new(),
            pending_peers: BTreeSet::new(),
            reachable: true,
            partner_announced: false,
            events,
        };
        coordinator.reset_anchor_session();
        (coordinator, rx)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> PairingPhase {
        self.session.phase
    }

    pub fn role(&self) -> Role {
        self.session.role
    }

    /// Snapshot of the session, including live timer deadlines.
    pub fn session(&self) -> PairingSession {
        PairingSession {
            discovery_deadline: self.discovery_timer.deadline(),
            pairing_deadline: self.pairing_timer.deadline(),
            ..self.session.clone()
        }
    }

    pub fn room(&self) -> &RoomCoordinator {
        &self.room
    }

    pub fn config(&self) -> &PairingConfig {
        &self.config
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn connected_peers(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.iter()
    }

    pub fn anchor_epoch(&self) -> u64 {
        self.anchor_epoch
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Process one input. Returns `false` once the coordinator has shut
    /// down.
    pub fn handle(&mut self, input: Input) -> bool {
        let running = match input {
            Input::Command(command) => self.on_command(command),
            Input::Discovery(event) => {
                self.on_discovery(event);
                true
            }
            Input::Anchor { epoch, outcome } => {
                self.on_anchor_outcome(epoch, outcome);
                true
            }
            Input::Store(event) => {
                self.room.on_store_event(event);
                true
            }
            Input::Timer { kind, generation } => {
                self.on_timer(kind, generation);
                true
            }
            Input::Reachability(reachable) => {
                self.on_reachability(reachable);
                true
            }
        };
        self.drain_room_signals();
        running
    }

    fn on_command(&mut self, command: Command) -> bool {
        debug!(?command, "Command");
        match command {
            Command::Begin => match self.config.mode {
                RoomMode::Paired => self.begin_pairing(),
                RoomMode::Global => self.begin_global_session(self.config.with_pairing),
            },
            Command::BeginPairing => self.begin_pairing(),
            Command::BeginGlobalSession { with_pairing } => {
                self.begin_global_session(with_pairing)
            }
            Command::SetReadyToSetAnchor => self.set_ready_to_set_anchor(),
            Command::RetryResolvingAnchor => self.retry_resolving_anchor(),
            Command::CancelPairing => self.cancel_pairing(),
            Command::LeaveRoom => self.leave_room(),
            Command::ResumeSession => self.room.resume_session(),
            Command::SetGlobalRoomName(name) => self.room.set_global_room_name(name),
            Command::UpdateStroke { stroke, remove } => self.room.update_stroke(&stroke, remove),
            Command::ClearAllStrokes => self.room.clear_all_strokes(),
            Command::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    fn drain_room_signals(&mut self) {
        loop {
            let signals = self.room.take_signals();
            if signals.is_empty() {
                break;
            }
            for signal in signals {
                self.on_room_signal(signal);
            }
        }
    }

    fn emit(&self, event: PairingEvent) {
        if self.events.send(event).is_err() {
            trace!("Event receiver dropped");
        }
    }

    fn set_phase(&mut self, phase: PairingPhase) {
        if self.session.phase == phase {
            return;
        }
        info!(from = %self.session.phase, to = %phase, "Pairing phase changed");
        self.session.phase = phase;
        self.emit(PairingEvent::PhaseChanged(phase));
    }

    fn fail(&mut self, phase: PairingPhase, reason: FailureReason) {
        let error = reason.to_error(&self.config);
        warn!(code = reason.code(), error = %error, phase = %phase, "Pairing failed");
        self.set_phase(phase);
        self.emit(PairingEvent::PairingFailed { reason });
    }

    fn connecting_phase(&self) -> PairingPhase {
        self.room
            .policy()
            .connecting_phase(self.session.role, self.room.is_pairing())
    }

    fn resolve_error_phase(&self) -> PairingPhase {
        self.room
            .policy()
            .resolve_error_phase(self.session.role, self.room.is_pairing())
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Start looking for a nearby partner and create a candidate room.
    pub fn begin_pairing(&mut self) {
        self.begin_session(Box::new(PeerRoomPolicy), true);
    }

    /// Join the shared global room instead of pairing over discovery.
    pub fn begin_global_session(&mut self, with_pairing: bool) {
        self.begin_session(Box::new(GlobalRoomPolicy), with_pairing);
    }

    fn begin_session(&mut self, policy: Box<dyn RoomDiscoveryPolicy>, with_pairing: bool) {
        if self.session.phase != PairingPhase::Idle {
            self.teardown();
        }
        info!(mode = ?policy.mode(), with_pairing, "Begin session");
        let discovers = policy.uses_peer_discovery();
        self.room.set_policy(policy);
        self.room.set_pairing(with_pairing);

        if !discovers {
            self.set_phase(if with_pairing {
                PairingPhase::Looking
            } else {
                PairingPhase::GlobalConnecting
            });
            self.room.locate_room();
            return;
        }

        self.discovery_timer
            .arm(self.config.discovery_timeout, &self.inbox);
        let advertisement = Advertisement {
            service_id: self.config.service_id.clone(),
            endpoint_name: self.config.display_name.clone(),
        };
        if let Err(e) = self.discovery.start(advertisement) {
            self.discovery_timer.cancel();
            let phase = self.idle_phase();
            self.fail(phase, FailureReason::Transport(e.to_string()));
            return;
        }
        self.set_phase(PairingPhase::Looking);

        if self.reachable {
            self.room.locate_room();
        } else {
            debug!("Offline, not creating a candidate room");
        }
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    fn on_discovery(&mut self, event: DiscoveryEvent) {
        if let DiscoveryEvent::PeerDisconnected(peer) = &event {
            self.on_peer_disconnected(peer);
            return;
        }
        if !self.session.phase.is_pairing_or_paired() {
            debug!(?event, "Ignoring discovery event outside a session");
            return;
        }
        match event {
            DiscoveryEvent::PeerFound(peer) => {
                if self.peers.contains(&peer) || self.pending_peers.contains(&peer) {
                    return;
                }
                debug!(peer = %peer, "Peer found, connecting");
                if self.discovery.connect(&peer) {
                    self.pending_peers.insert(peer);
                } else {
                    warn!(peer = %peer, "Connect request could not be issued");
                }
            }
            DiscoveryEvent::PeerLost(peer) => {
                self.pending_peers.remove(&peer);
                debug!(peer = %peer, "Peer lost");
            }
            DiscoveryEvent::PeerConnected(peer) => self.on_peer_connected(peer),
            DiscoveryEvent::ConnectFailed { peer, reason } => {
                self.pending_peers.remove(&peer);
                warn!(peer = %peer, reason = %reason, "Connection to peer failed");
            }
            DiscoveryEvent::DataReceived { from, payload } => self.on_peer_data(&from, &payload),
            DiscoveryEvent::PeerDisconnected(_) => {}
        }
    }

    fn on_peer_connected(&mut self, peer: PeerId) {
        self.pending_peers.remove(&peer);
        if !self.peers.insert(peer.clone()) {
            return;
        }
        info!(peer = %peer, "Peer connected");
        self.discovery_timer.cancel();
        self.discovery.stop_discovery();
        if self.session.phase == PairingPhase::Looking {
            self.set_phase(PairingPhase::Connected(Role::Unassigned));
        }
        self.announce_partner();
        if let Some(data) = self.room.room_data() {
            self.discovery.send(data.to_payload(), &peer);
        }
    }

    fn on_peer_disconnected(&mut self, peer: &PeerId) {
        self.pending_peers.remove(peer);
        if self.peers.remove(peer) {
            info!(peer = %peer, "Peer disconnected");
            if self.peers.is_empty() {
                self.partner_lost();
            }
        }
    }

    fn on_peer_data(&mut self, from: &PeerId, payload: &[u8]) {
        match RoomData::from_payload(payload) {
            Ok(data) => {
                debug!(peer = %from, room = %data.key, "Room announced");
                self.room_found(data);
            }
            Err(e) => warn!(peer = %from, error = %e, "Dropping malformed room announcement"),
        }
    }

    /// Apply the room tie-break to a room announced by a peer.
    fn room_found(&mut self, data: RoomData) {
        if self.room.current_key() == Some(&data.key) {
            debug!(room = %data.key, "Already in announced room");
            return;
        }
        if !self.room.should_join_room(&data.key) {
            debug!(room = %data.key, "Keeping own room");
            return;
        }
        info!(room = %data.key, "Switching to announced room");
        self.discovery.stop_discovery();
        self.session.role = Role::Unassigned;
        self.session.local_ready_to_set_anchor = false;
        self.session.partner_ready_to_set_anchor = false;
        self.room.leave_room();
        self.room.join_room(data);
    }

    fn announce_partner(&mut self) {
        if !self.partner_announced {
            self.partner_announced = true;
            self.emit(PairingEvent::PartnerJoined);
        }
    }

    fn partner_lost(&mut self) {
        if self.partner_announced {
            self.partner_announced = false;
            info!("Partner lost");
            self.emit(PairingEvent::PartnerLost);
        }
    }

    // -----------------------------------------------------------------------
    // Room signals
    // -----------------------------------------------------------------------

    fn on_room_signal(&mut self, signal: RoomSignal) {
        match signal {
            RoomSignal::RoomCreated(data) => {
                let payload = data.to_payload();
                for peer in &self.peers {
                    self.discovery.send(payload.clone(), peer);
                }
            }
            RoomSignal::RoomJoined(data) => debug!(room = %data.key, "Room joined"),
            RoomSignal::PartnerJoined { is_host } => self.on_partner_joined(is_host),
            RoomSignal::PartnerReadiness(ready) => self.on_partner_readiness(ready),
            RoomSignal::PartnerResolved => self.on_partner_resolved(),
            RoomSignal::AnchorIdCreated(anchor_id) => self.on_anchor_id_created(&anchor_id),
            RoomSignal::AnchorErrorReported => self.on_anchor_error_reported(),
            RoomSignal::AnchorMissing => self.on_anchor_missing(),
            RoomSignal::AnchorNotAvailable => self.on_anchor_not_available(),
            RoomSignal::PartnerLost => self.partner_lost(),
            RoomSignal::ConnectionLost => self.on_connection_lost(),
            RoomSignal::GlobalRoomUnavailable(reason) => {
                debug!(reason = %reason, "Global room unavailable");
                self.fail(PairingPhase::GlobalNoAnchor, FailureReason::GlobalRoomUnavailable);
            }
            RoomSignal::Stroke(event) => self.emit(stroke_event(event)),
        }
    }

    fn on_partner_joined(&mut self, is_host: bool) {
        let role = if is_host { Role::Host } else { Role::Partner };
        self.session.role = role;
        info!(?role, "Role assigned");
        self.emit(PairingEvent::RoleAssigned(role));
        self.announce_partner();
        self.discovery_timer.cancel();
        self.discovery.stop_discovery();

        match self.session.phase {
            PairingPhase::Looking | PairingPhase::Connected(_) => {
                self.set_phase(PairingPhase::Connected(role));
            }
            PairingPhase::HostReadyAndWaiting | PairingPhase::PartnerReadyAndWaiting => {
                self.advance_rendezvous();
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Anchor rendezvous
    // -----------------------------------------------------------------------

    /// Mark this device ready to set the anchor.
    pub fn set_ready_to_set_anchor(&mut self) {
        if !self.session.phase.is_pairing_or_paired() || !self.room.is_pairing() {
            warn!(phase = %self.session.phase, "Not pairing, ignoring ready");
            return;
        }
        if self.session.local_ready_to_set_anchor {
            debug!("Already ready to set anchor");
            return;
        }
        info!(role = ?self.session.role, "Ready to set anchor");
        self.session.local_ready_to_set_anchor = true;
        self.room.observe_anchor();
        self.room.set_ready(true);
        self.advance_rendezvous();
    }

    /// Host only commits to hosting once both sides are ready.
    fn advance_rendezvous(&mut self) {
        match (self.session.role, self.session.partner_ready_to_set_anchor) {
            (Role::Host, true) => self.begin_hosting(),
            (Role::Host, false) => self.set_phase(PairingPhase::HostReadyAndWaiting),
            (_, true) => {
                let phase = self.connecting_phase();
                self.set_phase(phase);
                self.pairing_timer
                    .arm(self.config.pairing_timeout, &self.inbox);
            }
            (_, false) => self.set_phase(PairingPhase::PartnerReadyAndWaiting),
        }
    }

    fn on_partner_readiness(&mut self, ready: bool) {
        self.session.partner_ready_to_set_anchor = ready;
        if !ready {
            return;
        }
        match (self.session.role, self.session.phase) {
            (Role::Host, PairingPhase::HostReadyAndWaiting) => self.begin_hosting(),
            (Role::Partner, PairingPhase::PartnerReadyAndWaiting) => {
                let phase = self.connecting_phase();
                self.set_phase(phase);
                self.pairing_timer
                    .arm(self.config.pairing_timeout, &self.inbox);
            }
            _ => {}
        }
    }

    fn begin_hosting(&mut self) {
        info!("Both sides ready, hosting anchor");
        self.emit(PairingEvent::AnchorReadyToCreate);
        let phase = self.connecting_phase();
        self.set_phase(phase);
        self.pairing_timer
            .arm(self.config.pairing_timeout, &self.inbox);

        match (self.anchor_session.as_mut(), self.tracking.anchor_pose()) {
            (Some(session), Some(pose)) => session.host_anchor(pose),
            (None, _) => self.anchor_failed(FailureReason::HostFailed(
                AnchorFailure::SessionUnavailable,
            )),
            (Some(_), None) => {
                self.anchor_failed(FailureReason::HostFailed(AnchorFailure::NotTracking))
            }
        }
    }

    fn resolve_anchor(&mut self, anchor_id: &str) {
        match self.anchor_session.as_mut() {
            Some(session) => {
                debug!(anchor_id = %anchor_id, "Resolving anchor");
                session.resolve_anchor(anchor_id);
            }
            None => self.anchor_failed(FailureReason::ResolveFailed(
                AnchorFailure::SessionUnavailable,
            )),
        }
    }

    fn on_anchor_id_created(&mut self, anchor_id: &str) {
        if self.session.role == Role::Host {
            return;
        }
        let solo = !self.room.is_pairing();
        if !solo && !self.session.local_ready_to_set_anchor {
            debug!(anchor_id = %anchor_id, "Anchor published before local ready, ignoring");
            return;
        }
        if self.session.phase.is_error() {
            debug!(anchor_id = %anchor_id, phase = %self.session.phase, "Anchor published after failure");
            return;
        }
        let phase = self.connecting_phase();
        self.set_phase(phase);
        self.pairing_timer
            .arm_if_idle(self.config.pairing_timeout, &self.inbox);
        self.resolve_anchor(anchor_id);
    }

    fn on_anchor_outcome(&mut self, epoch: u64, outcome: AnchorOutcome) {
        if epoch != self.anchor_epoch {
            debug!(epoch, current = self.anchor_epoch, "Dropping outcome of replaced anchor session");
            return;
        }
        match outcome {
            AnchorOutcome::Hosted { anchor_id, pose } => {
                if !self.session.phase.is_connecting() {
                    debug!(anchor_id = %anchor_id, "Anchor hosted after the attempt ended");
                    return;
                }
                info!(anchor_id = %anchor_id, "Anchor hosted");
                self.room.set_anchor_id(&anchor_id);
                self.emit(PairingEvent::AnchorResolved { pose });
            }
            AnchorOutcome::HostFailed(failure) => {
                let failure = self.with_tracking(failure);
                self.anchor_failed(FailureReason::HostFailed(failure));
            }
            AnchorOutcome::Resolved { anchor_id, pose } => {
                if !self.session.phase.is_connecting() {
                    debug!(anchor_id = %anchor_id, "Anchor resolved after the attempt ended");
                    return;
                }
                info!(anchor_id = %anchor_id, "Anchor resolved");
                self.pairing_timer.cancel();
                self.room.resolve_room();
                self.emit(PairingEvent::AnchorResolved { pose });
                self.set_phase(PairingPhase::Synced);
            }
            AnchorOutcome::ResolveFailed(failure) => {
                let failure = self.with_tracking(failure);
                if self.room.is_retrying() {
                    warn!(reason = %failure, "Retry failed, waiting for pairing timeout");
                    self.reset_anchor_session();
                    return;
                }
                self.anchor_failed(FailureReason::ResolveFailed(failure));
            }
        }
    }

    /// Report lost tracking instead of whatever the service said.
    fn with_tracking(&self, failure: AnchorFailure) -> AnchorFailure {
        if self.tracking.is_tracking() {
            failure
        } else {
            AnchorFailure::NotTracking
        }
    }

    fn anchor_failed(&mut self, reason: FailureReason) {
        self.pairing_timer.cancel();
        self.session.local_ready_to_set_anchor = false;
        self.room.set_ready(false);
        self.room.anchor_failed_to_resolve();
        self.room.set_retrying(false);
        self.reset_anchor_session();
        let phase = match reason {
            FailureReason::HostFailed(_) => PairingPhase::HostAnchorError,
            _ => self.resolve_error_phase(),
        };
        self.fail(phase, reason);
    }

    /// The partner resolved the anchor. Also ends a failed phase the
    /// partner's earlier error flag put the host in, since a partner
    /// retry can still succeed.
    fn on_partner_resolved(&mut self) {
        if self.session.role != Role::Host {
            return;
        }
        info!(phase = %self.session.phase, "Partner resolved, session synced");
        self.pairing_timer.cancel();
        self.room.resolve_room();
        self.set_phase(PairingPhase::Synced);
    }

    fn on_anchor_error_reported(&mut self) {
        let phase = self.session.phase;
        if !phase.is_pairing_or_paired() || phase == PairingPhase::Synced {
            debug!(phase = %phase, "Ignoring anchor error flag");
            return;
        }
        if self.room.is_retrying() {
            debug!("Ignoring anchor error flag during retry");
            return;
        }
        self.pairing_timer.cancel();
        self.session.local_ready_to_set_anchor = false;
        let phase = self
            .room
            .policy()
            .anchor_error_phase(self.session.role, self.room.is_pairing());
        self.fail(phase, FailureReason::AnchorErrorReported);
    }

    fn on_anchor_missing(&mut self) {
        let Some(phase) = self.room.policy().missing_anchor_phase(self.room.is_pairing()) else {
            return;
        };
        if self.session.phase.is_error() {
            return;
        }
        self.pairing_timer.cancel();
        self.fail(phase, FailureReason::NoAnchor);
    }

    fn on_anchor_not_available(&mut self) {
        warn!("Anchor was reset, leaving room");
        self.teardown();
        self.emit(PairingEvent::AnchorWasReset);
        let phase = self.idle_phase();
        self.set_phase(phase);
    }

    fn on_connection_lost(&mut self) {
        let phase = self.session.phase;
        if !phase.is_pairing_or_paired() || phase == PairingPhase::Synced {
            return;
        }
        warn!(phase = %phase, "Partner left mid-pairing");
        self.pairing_timer.cancel();
        self.set_phase(PairingPhase::ConnectionLost);
    }

    /// Re-issue resolution of the last known anchor.
    pub fn retry_resolving_anchor(&mut self) {
        let Some(anchor_id) = self.room.anchor_id().map(str::to_owned) else {
            warn!("No anchor to retry");
            self.emit(PairingEvent::PairingFailed {
                reason: FailureReason::NoAnchor,
            });
            return;
        };
        info!(anchor_id = %anchor_id, "Retrying anchor resolution");
        self.room.set_retrying(true);
        self.room.mark_unresolved();
        let phase = self.connecting_phase();
        self.set_phase(phase);
        self.pairing_timer
            .arm(self.config.pairing_timeout, &self.inbox);
        self.resolve_anchor(&anchor_id);
    }

    /// Replace the anchor session; outcomes of the old one become stale.
    fn reset_anchor_session(&mut self) {
        self.anchor_epoch += 1;
        let sink = AnchorSink::new(self.inbox.clone(), self.anchor_epoch);
        self.anchor_session = match self.anchors.create_session(sink) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "Anchor session unavailable");
                None
            }
        };
    }

    // -----------------------------------------------------------------------
    // Timeouts
    // -----------------------------------------------------------------------

    fn on_timer(&mut self, kind: TimerKind, generation: u64) {
        match kind {
            TimerKind::Discovery => {
                if self.discovery_timer.fire(generation) {
                    self.on_discovery_timeout();
                }
            }
            TimerKind::Pairing => {
                if self.pairing_timer.fire(generation) {
                    self.on_pairing_timeout();
                }
            }
            TimerKind::StoreWaitPoll | TimerKind::StoreWaitCap => {
                self.room.on_timer(kind, generation);
            }
        }
    }

    fn on_discovery_timeout(&mut self) {
        if self.session.phase != PairingPhase::Looking {
            debug!(phase = %self.session.phase, "Discovery deadline passed outside Looking");
            return;
        }
        self.discovery.stop_discovery();
        self.room.anchor_failed_to_resolve();
        self.fail(PairingPhase::DiscoveryTimeout, FailureReason::DiscoveryTimeout);
    }

    fn on_pairing_timeout(&mut self) {
        self.reset_anchor_session();
        self.room.set_retrying(false);
        self.room.anchor_failed_to_resolve();
        let phase = self.resolve_error_phase();
        self.fail(phase, FailureReason::PairingTimeout);
    }

    // -----------------------------------------------------------------------
    // Leaving
    // -----------------------------------------------------------------------

    fn idle_phase(&self) -> PairingPhase {
        if self.reachable {
            PairingPhase::Idle
        } else {
            PairingPhase::Offline
        }
    }

    fn teardown(&mut self) {
        self.discovery.stop();
        self.peers.clear();
        self.pending_peers.clear();
        self.discovery_timer.cancel();
        self.pairing_timer.cancel();
        self.room.set_retrying(false);
        self.room.leave_room();
        self.reset_anchor_session();
        self.session.role = Role::Unassigned;
        self.session.local_ready_to_set_anchor = false;
        self.session.partner_ready_to_set_anchor = false;
        self.partner_announced = false;
    }

    pub fn cancel_pairing(&mut self) {
        info!("Pairing cancelled");
        self.teardown();
        let phase = self.idle_phase();
        self.set_phase(phase);
    }

    pub fn leave_room(&mut self) {
        info!("Leaving room");
        self.teardown();
        let phase = self.idle_phase();
        self.set_phase(phase);
    }

    fn on_reachability(&mut self, reachable: bool) {
        if self.reachable == reachable {
            return;
        }
        self.reachable = reachable;
        if reachable {
            info!("Network reachable");
            if self.session.phase == PairingPhase::Offline {
                self.set_phase(PairingPhase::Idle);
            }
            return;
        }
        warn!("Network unreachable");
        if self.session.phase.is_pairing_or_paired() {
            self.emit(PairingEvent::OfflineDetected);
            self.teardown();
        }
        self.set_phase(PairingPhase::Offline);
    }

    fn shutdown(&mut self) {
        info!("Pairing coordinator shutting down");
        self.teardown();
        let phase = self.idle_phase();
        self.set_phase(phase);
    }
}

fn stroke_event(event: StrokeEvent) -> PairingEvent {
    match event {
        StrokeEvent::LocalAdded { handle, id } => PairingEvent::LocalStrokeAdded { handle, id },
        StrokeEvent::LocalRemoved { handle, id } => PairingEvent::LocalStrokeRemoved { handle, id },
        StrokeEvent::PartnerAdded(stroke) => PairingEvent::PartnerStrokeAdded(stroke),
        StrokeEvent::PartnerUpdated { id, points } => {
            PairingEvent::PartnerStrokeUpdated { id, points }
        }
        StrokeEvent::PartnerRemoved { id } => PairingEvent::PartnerStrokeRemoved { id },
    }
}
