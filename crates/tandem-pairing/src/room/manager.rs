//! Room lifecycle in the replicated store.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde_json::Value;
use tandem_common::{now_millis, PairingError, ParticipantId, RoomKey};
use tracing::{debug, info, trace, warn};

use super::policy::{policy_for, RoomDiscoveryPolicy, RoomEntry};
use super::subscriptions::Subscriptions;
use super::types::{Feed, PendingOp, RoomRequest, RoomSignal};
use crate::config::PairingConfig;
use crate::election::{elect_host, should_join_room};
use crate::inbox::Inbox;
use crate::pairing::Role;
use crate::protocol::{self, AnchorRecord, ParticipantRecord, RoomData, RoomMeta, ANCHOR};
use crate::services::{ChildChange, ObserveKind, RequestId, RoomStore, StoreEvent};
use crate::strokes::{LocalStroke, StrokeEvent, StrokeSyncEngine};
use crate::timer::{Timer, TimerKind};

const UPDATED_AT: &str = "updatedAtTimestamp";

/// Owns one room at a time: creating or joining it, the participant
/// roster, the anchor record and the stroke feed.
///
/// Results are queued as [`RoomSignal`]s and drained by the owner with
/// [`RoomCoordinator::take_signals`] after each input.
pub struct RoomCoordinator {
    config: PairingConfig,
    store: Box<dyn RoomStore>,
    inbox: Inbox,
    policy: Box<dyn RoomDiscoveryPolicy>,

    room: Option<RoomData>,
    is_pairing: bool,
    is_host: bool,
    partner: Option<ParticipantId>,
    is_resolved: bool,
    is_retrying: bool,
    anchor_id: Option<String>,
    local: ParticipantRecord,
    participants: BTreeMap<ParticipantId, ParticipantRecord>,

    subscriptions: Subscriptions,
    pending: Vec<PendingOp>,
    poll_timer: Timer,
    cap_timer: Timer,
    requests: HashMap<RequestId, RoomRequest>,

    strokes: StrokeSyncEngine,
    signals: VecDeque<RoomSignal>,
}

impl RoomCoordinator {
    pub fn new(config: PairingConfig, store: Box<dyn RoomStore>, inbox: Inbox) -> Self {
        let policy = policy_for(config.mode);
        Self {
            config,
            store,
            inbox,
            policy,
            room: None,
            is_pairing: false,
            is_host: false,
            partner: None,
            is_resolved: false,
            is_retrying: false,
            anchor_id: None,
            local: ParticipantRecord::default(),
            participants: BTreeMap::new(),
            subscriptions: Subscriptions::default(),
            pending: Vec::new(),
            poll_timer: Timer::new(TimerKind::StoreWaitPoll),
            cap_timer: Timer::new(TimerKind::StoreWaitCap),
            requests: HashMap::new(),
            strokes: StrokeSyncEngine::new(),
            signals: VecDeque::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &PairingConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn RoomDiscoveryPolicy {
        self.policy.as_ref()
    }

    pub fn set_policy(&mut self, policy: Box<dyn RoomDiscoveryPolicy>) {
        debug!(?policy, "Room policy selected");
        self.policy = policy;
    }

    pub fn set_pairing(&mut self, is_pairing: bool) {
        self.is_pairing = is_pairing;
    }

    pub fn is_pairing(&self) -> bool {
        self.is_pairing
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// This device's elected role, if a partner has been seen.
    pub fn role(&self) -> Role {
        match (&self.partner, self.is_host) {
            (None, _) => Role::Unassigned,
            (Some(_), true) => Role::Host,
            (Some(_), false) => Role::Partner,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.is_resolved
    }

    pub fn is_retrying(&self) -> bool {
        self.is_retrying
    }

    pub fn room_data(&self) -> Option<&RoomData> {
        self.room.as_ref()
    }

    pub fn current_key(&self) -> Option<&RoomKey> {
        self.room.as_ref().map(|room| &room.key)
    }

    pub fn anchor_id(&self) -> Option<&str> {
        self.anchor_id.as_deref()
    }

    pub fn local_record(&self) -> ParticipantRecord {
        self.local
    }

    /// Other participants currently in the room.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn strokes(&self) -> &StrokeSyncEngine {
        &self.strokes
    }

    /// Whether room operations are queued behind store readiness.
    pub fn is_waiting_for_store(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take_signals(&mut self) -> Vec<RoomSignal> {
        self.signals.drain(..).collect()
    }

    fn signal(&mut self, signal: RoomSignal) {
        self.signals.push_back(signal);
    }

    // -----------------------------------------------------------------------
    // Locating a room
    // -----------------------------------------------------------------------

    /// Start locating a room the way the active policy prescribes.
    pub fn locate_room(&mut self) {
        match self.policy.entry() {
            RoomEntry::CreateCandidate => self.create_room(),
            RoomEntry::FindGlobal => self.find_global_room(),
        }
    }

    /// Create a fresh candidate room and register in it.
    pub fn create_room(&mut self) {
        if let Err(e) = self.ensure_store_ready(PendingOp::CreateRoom) {
            debug!(error = %e, "Deferred");
            return;
        }
        self.create_room_now();
    }

    fn create_room_now(&mut self) {
        let key = RoomKey::from(self.store.child_key(&self.config.rooms_root));
        let data = RoomData::new(key, now_millis());
        let meta = RoomMeta {
            updated_at_timestamp: data.timestamp,
            display_name: self.config.display_name.clone(),
        };
        if let Some(Value::Object(children)) = protocol::to_value(&meta) {
            self.store
                .update(&self.config.room_path(&data.key), children, None);
        }
        info!(room = %data.key, "Room created");
        self.enter_room(data.clone());
        self.signal(RoomSignal::RoomCreated(data));
    }

    /// Join an existing room, abandoning any candidate still waiting to be
    /// created.
    pub fn join_room(&mut self, data: RoomData) {
        self.pending.retain(|op| *op != PendingOp::CreateRoom);
        if let Err(e) = self.ensure_store_ready(PendingOp::JoinRoom(data.clone())) {
            debug!(error = %e, "Deferred");
            return;
        }
        self.join_room_now(data);
    }

    fn join_room_now(&mut self, data: RoomData) {
        if self.current_key() == Some(&data.key) {
            debug!(room = %data.key, "Already in room");
            return;
        }
        if self.room.is_some() {
            self.leave_room();
        }
        let path = format!("{}/{UPDATED_AT}", self.config.room_path(&data.key));
        self.store.write(&path, Some(Value::from(now_millis())), None);
        info!(room = %data.key, "Joined room");
        self.enter_room(data.clone());
        self.signal(RoomSignal::RoomJoined(data));
    }

    /// Whether a room announced by a peer takes precedence over ours.
    pub fn should_join_room(&self, announced: &RoomKey) -> bool {
        should_join_room(self.current_key(), announced)
    }

    /// Read the global room pointer and join the room it names, claiming
    /// the pointer first if nobody has.
    pub fn find_global_room(&mut self) {
        if let Err(e) = self.ensure_store_ready(PendingOp::FindGlobalRoom) {
            debug!(error = %e, "Deferred");
            return;
        }
        self.find_global_room_now();
    }

    fn find_global_room_now(&mut self) {
        let request = RequestId::next();
        self.requests.insert(request, RoomRequest::ReadGlobalPointer);
        let path = self.config.global_pointer_path();
        debug!(path = %path, "Reading global room pointer");
        self.store.read_once(&path, request);
    }

    pub fn set_global_room_name(&mut self, name: impl Into<String>) {
        self.config.global_room_name = name.into();
        info!(name = %self.config.global_room_name, "Global room name set");
    }

    fn on_pointer_read(&mut self, result: Result<Option<Value>, String>) {
        match result {
            Ok(None) => {
                let name = self.config.global_room_name.clone();
                let request = RequestId::next();
                self.requests
                    .insert(request, RoomRequest::ClaimGlobalPointer(RoomKey::from(name.as_str())));
                info!(room = %name, "Claiming global room pointer");
                self.store.write(
                    &self.config.global_pointer_path(),
                    Some(Value::String(name)),
                    Some(request),
                );
            }
            Ok(Some(Value::String(pointer))) => match room_key_from_pointer(&pointer) {
                Some(key) => self.join_room_now(RoomData::new(key, now_millis())),
                None => self.global_room_unavailable(format!("empty pointer {pointer:?}")),
            },
            Ok(Some(other)) => {
                self.global_room_unavailable(format!("pointer is not a room name: {other}"))
            }
            Err(e) => self.global_room_unavailable(e),
        }
    }

    fn on_pointer_claimed(&mut self, key: RoomKey, result: Result<(), String>) {
        match result {
            Ok(()) => self.join_room_now(RoomData::new(key, now_millis())),
            Err(e) => self.global_room_unavailable(e),
        }
    }

    fn global_room_unavailable(&mut self, reason: String) {
        warn!(reason = %reason, "Global room unavailable");
        self.signal(RoomSignal::GlobalRoomUnavailable(reason));
    }

    // -----------------------------------------------------------------------
    // Store readiness
    // -----------------------------------------------------------------------

    /// Fails with `StoreNotReady` after queueing `op` when the store cannot
    /// take writes yet; the op runs once the store is ready or the wait cap
    /// passes.
    fn ensure_store_ready(&mut self, op: PendingOp) -> Result<(), PairingError> {
        if self.store.is_ready() {
            return Ok(());
        }
        let error = PairingError::StoreNotReady(format!("{op:?} queued"));
        if !self.pending.contains(&op) {
            info!(?op, "Store not ready, deferring");
            self.pending.push(op);
        }
        self.poll_timer
            .arm_if_idle(self.config.store_ready_poll, &self.inbox);
        self.cap_timer
            .arm_if_idle(self.config.store_ready_cap, &self.inbox);
        Err(error)
    }

    fn flush_pending(&mut self) {
        self.poll_timer.cancel();
        self.cap_timer.cancel();
        for op in std::mem::take(&mut self.pending) {
            match op {
                PendingOp::CreateRoom => self.create_room_now(),
                PendingOp::JoinRoom(data) => self.join_room_now(data),
                PendingOp::FindGlobalRoom => self.find_global_room_now(),
            }
        }
    }

    /// Handle a store-wait timer. Returns `false` for other timer kinds.
    pub fn on_timer(&mut self, kind: TimerKind, generation: u64) -> bool {
        match kind {
            TimerKind::StoreWaitPoll => {
                if !self.poll_timer.fire(generation) {
                    return true;
                }
                if self.store.is_ready() {
                    debug!("Store became ready");
                    self.flush_pending();
                } else {
                    self.poll_timer
                        .arm(self.config.store_ready_poll, &self.inbox);
                }
                true
            }
            TimerKind::StoreWaitCap => {
                if self.cap_timer.fire(generation) && !self.pending.is_empty() {
                    warn!(
                        pending = self.pending.len(),
                        "Store still not ready, proceeding anyway"
                    );
                    self.flush_pending();
                }
                true
            }
            TimerKind::Discovery | TimerKind::Pairing => false,
        }
    }

    // -----------------------------------------------------------------------
    // Participation
    // -----------------------------------------------------------------------

    fn enter_room(&mut self, data: RoomData) {
        self.room = Some(data);
        self.local = ParticipantRecord::joining(self.is_pairing);
        self.participate_in_room();
    }

    /// Register the local participant and subscribe to the room's feeds.
    pub fn participate_in_room(&mut self) {
        let Some(key) = self.current_key().cloned() else {
            return;
        };
        match self.store.local_id() {
            Some(me) => {
                let path = self.config.participant_path(&key, &me);
                self.store.write(&path, protocol::to_value(&self.local), None);
                self.store.remove_on_disconnect(&path);
            }
            None => warn!(room = %key, "Store identity unavailable, not registering participant"),
        }

        let participants = self.config.participants_path(&key);
        self.subscriptions.acquire(
            self.store.as_mut(),
            Feed::Participants,
            &participants,
            ObserveKind::Children,
        );
        let room_path = self.config.room_path(&key);
        self.subscriptions.acquire(
            self.store.as_mut(),
            Feed::RoomChildren,
            &room_path,
            ObserveKind::Children,
        );

        let lines = self.config.lines_path(&key);
        if self.strokes.lines_path() != Some(lines.as_str()) {
            self.strokes.attach(lines, self.store.local_id());
        }

        if self.policy.observe_anchor_on_join(self.is_pairing) {
            self.observe_anchor();
        }
    }

    /// Re-register after the store dropped this device, e.g. on app resume.
    pub fn resume_session(&mut self) {
        let Some(key) = self.current_key().cloned() else {
            debug!("No room to resume");
            return;
        };
        let anchor = self.subscriptions.is_active(Feed::Anchor);
        let strokes = self.subscriptions.is_active(Feed::Strokes);
        self.subscriptions.release_all(self.store.as_mut());
        info!(room = %key, "Resuming room session");

        self.participate_in_room();
        if anchor {
            self.subscriptions.acquire(
                self.store.as_mut(),
                Feed::Anchor,
                &self.config.anchor_path(&key),
                ObserveKind::Value,
            );
        }
        if strokes {
            self.subscriptions.acquire(
                self.store.as_mut(),
                Feed::Strokes,
                &self.config.lines_path(&key),
                ObserveKind::Children,
            );
        }
    }

    fn write_local(&mut self) {
        let (Some(key), Some(me)) = (self.current_key().cloned(), self.store.local_id()) else {
            return;
        };
        let path = self.config.participant_path(&key, &me);
        self.store.write(&path, protocol::to_value(&self.local), None);
    }

    /// Publish this device's readiness to set the anchor.
    pub fn set_ready(&mut self, ready: bool) {
        self.local.ready_to_set_anchor = ready;
        self.write_local();
    }

    fn on_participant(&mut self, change: ChildChange, key: String, value: Value) {
        let id = ParticipantId::from(key);
        let me = self.store.local_id();
        if me.as_ref() == Some(&id) {
            return;
        }
        if change == ChildChange::Removed {
            self.on_participant_removed(&id);
            return;
        }

        let record: ParticipantRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(participant = %id, error = %e, "Dropping unreadable participant");
                return;
            }
        };
        let previous = self.participants.insert(id.clone(), record);
        if previous.is_none() {
            debug!(participant = %id, is_pairing = record.is_pairing, "Participant joined");
        }

        let mut before = previous.unwrap_or_default();
        if self.partner.is_none() && self.is_pairing && record.is_pairing {
            let Some(me) = me else {
                warn!(participant = %id, "Cannot elect host without a store identity");
                return;
            };
            self.is_host = elect_host(&me, &id) == Role::Host;
            self.partner = Some(id.clone());
            before = ParticipantRecord::default();
            info!(partner = %id, is_host = self.is_host, "Partner joined, roles elected");
            self.signal(RoomSignal::PartnerJoined {
                is_host: self.is_host,
            });
        }
        if self.partner.as_ref() != Some(&id) {
            return;
        }

        if record.ready_to_set_anchor != before.ready_to_set_anchor {
            debug!(partner = %id, ready = record.ready_to_set_anchor, "Partner readiness changed");
            self.signal(RoomSignal::PartnerReadiness(record.ready_to_set_anchor));
        }
        if self.is_host && record.anchor_resolved && !before.anchor_resolved {
            info!(partner = %id, "Partner resolved the anchor");
            self.signal(RoomSignal::PartnerResolved);
        }
    }

    fn on_participant_removed(&mut self, id: &ParticipantId) {
        let Some(removed) = self.participants.remove(id) else {
            return;
        };
        info!(participant = %id, "Participant left");
        if self.partner.as_ref() == Some(id) {
            self.partner = None;
        }
        if removed.is_pairing && self.is_pairing {
            self.signal(RoomSignal::ConnectionLost);
        }
        if self.participants.is_empty() {
            self.signal(RoomSignal::PartnerLost);
        }
    }

    fn on_room_child(&mut self, change: ChildChange, key: &str) {
        if change == ChildChange::Removed && key == ANCHOR && self.is_resolved {
            warn!("Anchor removed from resolved room");
            self.signal(RoomSignal::AnchorNotAvailable);
        }
    }

    // -----------------------------------------------------------------------
    // Anchor record
    // -----------------------------------------------------------------------

    /// Subscribe to the room's anchor record, clearing it first unless the
    /// policy reuses an existing anchor.
    pub fn observe_anchor(&mut self) {
        let Some(key) = self.current_key().cloned() else {
            return;
        };
        let path = self.config.anchor_path(&key);
        if self.policy.clear_anchor_before_observing(self.is_pairing) {
            debug!(room = %key, "Clearing anchor record");
            self.anchor_id = None;
            self.store.write(&path, None, None);
        }
        self.subscriptions.acquire(
            self.store.as_mut(),
            Feed::Anchor,
            &path,
            ObserveKind::Value,
        );
    }

    fn on_anchor_value(&mut self, value: Option<Value>) {
        let record = match value {
            None => AnchorRecord::default(),
            Some(value) => match serde_json::from_value::<AnchorRecord>(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Dropping unreadable anchor record");
                    return;
                }
            },
        };

        if record.anchor_resolution_error {
            info!("Anchor resolution error reported");
            if self.local.ready_to_set_anchor {
                self.set_ready(false);
            }
            self.signal(RoomSignal::AnchorErrorReported);
            return;
        }

        match record.anchor_id {
            Some(id) if self.anchor_id.as_deref() != Some(id.as_str()) => {
                info!(anchor_id = %id, "Anchor id published");
                self.anchor_id = Some(id.clone());
                if !self.is_host {
                    self.signal(RoomSignal::AnchorIdCreated(id));
                }
            }
            Some(_) => {}
            None => {
                if !self.is_resolved
                    && self.policy.missing_anchor_phase(self.is_pairing).is_some()
                {
                    info!("Room has no anchor");
                    self.signal(RoomSignal::AnchorMissing);
                }
            }
        }
    }

    /// Host only: publish the id of the anchor it just hosted.
    pub fn set_anchor_id(&mut self, anchor_id: &str) {
        let Some(key) = self.current_key().cloned() else {
            warn!(anchor_id = %anchor_id, "Hosted an anchor without a room");
            return;
        };
        self.anchor_id = Some(anchor_id.to_string());
        self.store.write(
            &self.config.anchor_path(&key),
            protocol::to_value(&AnchorRecord::with_id(anchor_id)),
            None,
        );
    }

    /// Mark the anchor resolved here and start syncing strokes.
    pub fn resolve_room(&mut self) {
        let Some(key) = self.current_key().cloned() else {
            return;
        };
        self.is_resolved = true;
        self.is_retrying = false;
        self.local.anchor_resolved = true;
        self.local.is_pairing = false;
        self.write_local();
        if self.policy.publish_resolution_error(self.is_pairing) {
            self.store.write(
                &self.config.anchor_error_path(&key),
                Some(Value::Bool(false)),
                None,
            );
        }
        self.subscriptions.acquire(
            self.store.as_mut(),
            Feed::Strokes,
            &self.config.lines_path(&key),
            ObserveKind::Children,
        );
        info!(room = %key, "Room resolved");
    }

    /// Tell the room this device could not resolve the anchor.
    pub fn anchor_failed_to_resolve(&mut self) {
        if self.is_retrying {
            debug!("Retry in flight, not publishing resolution error");
            return;
        }
        let Some(key) = self.current_key().cloned() else {
            return;
        };
        if !self.policy.publish_resolution_error(self.is_pairing) {
            return;
        }
        warn!(room = %key, "Publishing anchor resolution error");
        self.store.write(
            &self.config.anchor_path(&key),
            protocol::to_value(&AnchorRecord::failed()),
            None,
        );
    }

    pub fn set_retrying(&mut self, retrying: bool) {
        self.is_retrying = retrying;
    }

    pub fn mark_unresolved(&mut self) {
        self.is_resolved = false;
    }

    // -----------------------------------------------------------------------
    // Leaving
    // -----------------------------------------------------------------------

    /// Leave the current room. Safe to call repeatedly.
    pub fn leave_room(&mut self) {
        self.subscriptions.release_all(self.store.as_mut());
        if let Some(data) = self.room.take() {
            if let Some(me) = self.store.local_id() {
                self.store
                    .write(&self.config.participant_path(&data.key, &me), None, None);
            }
            info!(room = %data.key, "Left room");
        }
        self.pending.clear();
        self.poll_timer.cancel();
        self.cap_timer.cancel();
        self.requests.clear();

        self.is_host = false;
        self.partner = None;
        self.is_resolved = false;
        self.is_retrying = false;
        self.anchor_id = None;
        self.local = ParticipantRecord::default();
        self.participants.clear();
        self.strokes.detach();
    }

    // -----------------------------------------------------------------------
    // Strokes
    // -----------------------------------------------------------------------

    pub fn update_stroke(&mut self, stroke: &LocalStroke, remove: bool) {
        let mut events = Vec::new();
        self.strokes
            .update_stroke(self.store.as_mut(), stroke, remove, &mut events);
        self.push_stroke_events(events);
    }

    pub fn clear_all_strokes(&mut self) {
        self.strokes.clear_all_strokes(self.store.as_mut());
    }

    fn push_stroke_events(&mut self, events: Vec<StrokeEvent>) {
        self.signals
            .extend(events.into_iter().map(RoomSignal::Stroke));
    }

    // -----------------------------------------------------------------------
    // Store events
    // -----------------------------------------------------------------------

    pub fn on_store_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Ready => {
                if !self.pending.is_empty() {
                    info!(pending = self.pending.len(), "Store ready");
                    self.flush_pending();
                }
            }
            StoreEvent::Child {
                subscription,
                change,
                key,
                value,
            } => match self.subscriptions.feed_of(subscription) {
                Some(Feed::Participants) => self.on_participant(change, key, value),
                Some(Feed::RoomChildren) => self.on_room_child(change, &key),
                Some(Feed::Strokes) => {
                    let mut events = Vec::new();
                    self.strokes.on_remote(change, &key, &value, &mut events);
                    self.push_stroke_events(events);
                }
                Some(Feed::Anchor) | None => {
                    trace!(subscription = subscription.0, "Dropping stale child event");
                }
            },
            StoreEvent::Value {
                subscription,
                value,
            } => match self.subscriptions.feed_of(subscription) {
                Some(Feed::Anchor) => self.on_anchor_value(value),
                _ => trace!(subscription = subscription.0, "Dropping stale value event"),
            },
            StoreEvent::ReadCompleted { request, result } => match self.requests.remove(&request) {
                Some(RoomRequest::ReadGlobalPointer) => self.on_pointer_read(result),
                Some(other) => warn!(?other, "Read completed for a write request"),
                None => trace!(request = request.0, "Dropping stale read"),
            },
            StoreEvent::WriteCompleted { request, result } => match self.requests.remove(&request) {
                Some(RoomRequest::ClaimGlobalPointer(key)) => self.on_pointer_claimed(key, result),
                Some(other) => warn!(?other, "Write completed for a read request"),
                None => {
                    let mut events = Vec::new();
                    let tracked = self.strokes.on_write_completed(
                        self.store.as_mut(),
                        request,
                        &result,
                        &mut events,
                    );
                    if !tracked {
                        trace!(request = request.0, "Untracked write completed");
                    }
                    self.push_stroke_events(events);
                }
            },
            StoreEvent::Cancelled {
                subscription,
                reason,
            } => {
                if let Some(feed) = self.subscriptions.forget(subscription) {
                    warn!(?feed, reason = %reason, "Store cancelled subscription");
                }
            }
        }
    }
}

/// The room key a global pointer names: its last path segment.
fn room_key_from_pointer(pointer: &str) -> Option<RoomKey> {
    pointer
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(RoomKey::from)
}
