use std::time::Duration;

use serde_json::json;
use tandem_common::{ParticipantId, PeerId, Point3, Pose};
use tandem_config::RoomMode;

use super::*;
use crate::config::PairingConfig;
use crate::inbox::{Inbox, Input};
use crate::memory::{pump_all, SimDevice, SimWorld};
use crate::services::{AnchorFailure, AnchorOutcome, AnchorService, AnchorSink, DiscoveryEvent};
use crate::strokes::{LocalStroke, StrokeStyle};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn failures(events: &[PairingEvent]) -> Vec<FailureReason> {
    events
        .iter()
        .filter_map(|event| match event {
            PairingEvent::PairingFailed { reason } => Some(reason.clone()),
            _ => None,
        })
        .collect()
}

fn count(events: &[PairingEvent], wanted: &PairingEvent) -> usize {
    events.iter().filter(|event| *event == wanted).count()
}

async fn wait(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// alice and bob discover each other and settle in one room.
fn connected_pair(world: &SimWorld) -> (SimDevice, SimDevice) {
    let mut alice = world.device("alice");
    let mut bob = world.device("bob");
    alice.command(Command::BeginPairing);
    bob.command(Command::BeginPairing);
    pump_all(&mut [&mut alice, &mut bob]);
    (alice, bob)
}

/// alice and bob share a resolved anchor.
fn synced_pair(world: &SimWorld) -> (SimDevice, SimDevice) {
    let (mut alice, mut bob) = connected_pair(world);
    alice.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    (alice, bob)
}

fn stroke(points: &[(f32, f32, f32)]) -> LocalStroke {
    let mut stroke = LocalStroke::new(StrokeStyle::default());
    for &(x, y, z) in points {
        stroke.push(Point3::new(x, y, z));
    }
    stroke
}

fn global_config(with_pairing: bool) -> PairingConfig {
    PairingConfig {
        mode: RoomMode::Global,
        with_pairing,
        global_room_name: "lobby".into(),
        ..PairingConfig::default()
    }
}

/// Host an anchor in the shared cloud outside any device.
fn seed_anchor(world: &SimWorld, pose: Pose) -> String {
    let (inbox, mut rx) = Inbox::channel();
    let mut session = world
        .anchors
        .service()
        .create_session(AnchorSink::new(inbox, 0))
        .unwrap();
    session.host_anchor(pose);
    match rx.try_recv() {
        Ok(Input::Anchor {
            outcome: AnchorOutcome::Hosted { anchor_id, .. },
            ..
        }) => anchor_id,
        other => panic!("expected hosted anchor, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Discovery and election
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn both_devices_agree_on_room_and_roles() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);

    assert_eq!(alice.role(), Role::Host);
    assert_eq!(bob.role(), Role::Partner);
    assert_eq!(alice.phase(), PairingPhase::Connected(Role::Host));
    assert_eq!(bob.phase(), PairingPhase::Connected(Role::Partner));
    assert_eq!(
        alice.coordinator().room().current_key(),
        bob.coordinator().room().current_key()
    );

    let alice_events = alice.drain_events();
    assert_eq!(count(&alice_events, &PairingEvent::PartnerJoined), 1);
    assert!(alice_events.contains(&PairingEvent::RoleAssigned(Role::Host)));
    assert!(bob
        .drain_events()
        .contains(&PairingEvent::RoleAssigned(Role::Partner)));
}

#[tokio::test(start_paused = true)]
async fn discovery_stops_once_a_peer_connects() {
    let world = SimWorld::new();
    let (alice, bob) = connected_pair(&world);

    assert!(!world.medium.is_discovering(&PeerId::from("alice")));
    assert!(!world.medium.is_discovering(&PeerId::from("bob")));
    assert!(alice.coordinator().session().discovery_deadline.is_none());
    assert!(bob.coordinator().session().discovery_deadline.is_none());
    assert_eq!(
        alice.coordinator().connected_peers().collect::<Vec<_>>(),
        vec![&PeerId::from("bob")]
    );
}

#[tokio::test(start_paused = true)]
async fn discovery_timeout_fires_exactly_once() {
    let world = SimWorld::new();
    let mut alice = world.device("alice");
    alice.command(Command::BeginPairing);
    alice.pump();
    assert_eq!(alice.phase(), PairingPhase::Looking);
    assert!(alice.coordinator().session().discovery_deadline.is_some());

    wait(11).await;
    alice.pump();
    wait(30).await;
    alice.pump();

    assert_eq!(alice.phase(), PairingPhase::DiscoveryTimeout);
    assert_eq!(failures(&alice.drain_events()), vec![FailureReason::DiscoveryTimeout]);
    assert!(!world.medium.is_discovering(&PeerId::from("alice")));
}

#[tokio::test(start_paused = true)]
async fn malformed_room_announcement_is_ignored() {
    let world = SimWorld::new();
    let mut alice = world.device("alice");
    alice.command(Command::BeginPairing);
    alice.pump();
    let key = alice.coordinator().room().current_key().cloned();

    alice.post(Input::Discovery(DiscoveryEvent::DataReceived {
        from: PeerId::from("bob"),
        payload: b"not-a-room".to_vec(),
    }));
    alice.pump();

    assert_eq!(alice.phase(), PairingPhase::Looking);
    assert_eq!(alice.coordinator().room().current_key().cloned(), key);
}

#[tokio::test(start_paused = true)]
async fn late_store_joins_the_announced_room() {
    let world = SimWorld::new();
    let mut alice = world.device_with("alice", PairingConfig::default(), false);
    let mut bob = world.device("bob");
    alice.command(Command::BeginPairing);
    bob.command(Command::BeginPairing);
    pump_all(&mut [&mut alice, &mut bob]);

    assert!(alice.coordinator().room().is_waiting_for_store());
    assert!(alice.coordinator().room().current_key().is_none());

    alice.store().set_ready();
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(
        alice.coordinator().room().current_key(),
        bob.coordinator().room().current_key()
    );
    assert_eq!(alice.role(), Role::Host);
    assert_eq!(bob.role(), Role::Partner);
}

// ---------------------------------------------------------------------------
// Anchor rendezvous
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn host_waits_for_partner_before_hosting() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    alice.drain_events();

    alice.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.phase(), PairingPhase::HostReadyAndWaiting);
    assert_eq!(world.anchors.anchor_count(), 0);
    assert!(!alice.saw(&PairingEvent::AnchorReadyToCreate));

    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert!(alice.saw(&PairingEvent::AnchorReadyToCreate));
    assert_eq!(world.anchors.anchor_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn partner_ready_first_waits_for_host() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);

    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    assert_eq!(bob.phase(), PairingPhase::PartnerReadyAndWaiting);
    assert!(bob.coordinator().session().pairing_deadline.is_none());

    alice.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    assert_eq!(alice.phase(), PairingPhase::Synced);
    assert_eq!(bob.phase(), PairingPhase::Synced);
}

#[tokio::test(start_paused = true)]
async fn both_devices_reach_synced_on_the_hosted_pose() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    let pose = Pose::at(Point3::new(0.5, 0.0, -1.0));
    alice.tracking().set_pose(pose);

    alice.command(Command::SetReadyToSetAnchor);
    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.phase(), PairingPhase::Synced);
    assert_eq!(bob.phase(), PairingPhase::Synced);
    assert_eq!(alice.view().anchor_pose, Some(pose));
    assert_eq!(bob.view().anchor_pose, Some(pose));
    assert!(alice.coordinator().room().is_resolved());
    assert!(bob.coordinator().room().is_resolved());
    assert!(alice.coordinator().session().pairing_deadline.is_none());
    assert!(bob.coordinator().session().pairing_deadline.is_none());
    assert!(failures(&alice.drain_events()).is_empty());
    assert!(failures(&bob.drain_events()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn ready_outside_a_session_is_ignored() {
    let world = SimWorld::new();
    let mut alice = world.device("alice");
    alice.command(Command::SetReadyToSetAnchor);
    alice.pump();
    assert_eq!(alice.phase(), PairingPhase::Idle);
    assert!(!alice.coordinator().session().local_ready_to_set_anchor);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn host_without_tracking_fails_and_flags_the_room() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    alice.tracking().set_tracking(false);

    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    alice.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.phase(), PairingPhase::HostAnchorError);
    assert_eq!(
        failures(&alice.drain_events()),
        vec![FailureReason::HostFailed(AnchorFailure::NotTracking)]
    );
    assert_eq!(bob.phase(), PairingPhase::PartnerResolveError);
    assert_eq!(
        failures(&bob.drain_events()),
        vec![FailureReason::AnchorErrorReported]
    );
}

#[tokio::test(start_paused = true)]
async fn partner_resolve_failure_reaches_the_host() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    world.anchors.fail_next_resolve(AnchorFailure::Service(5));

    alice.command(Command::SetReadyToSetAnchor);
    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(bob.phase(), PairingPhase::PartnerResolveError);
    assert_eq!(
        failures(&bob.drain_events()),
        vec![FailureReason::ResolveFailed(AnchorFailure::Service(5))]
    );
    assert_eq!(alice.phase(), PairingPhase::HostResolveError);
    assert_eq!(
        failures(&alice.drain_events()),
        vec![FailureReason::AnchorErrorReported]
    );
    assert!(!bob.coordinator().session().local_ready_to_set_anchor);
}

#[tokio::test(start_paused = true)]
async fn pairing_timeout_when_host_never_answers() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);

    alice.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    bob.command(Command::SetReadyToSetAnchor);
    bob.pump();
    assert_eq!(bob.phase(), PairingPhase::PartnerConnecting);
    assert!(bob.coordinator().session().pairing_deadline.is_some());

    // alice is never pumped, so no anchor is ever hosted
    wait(61).await;
    bob.pump();

    assert_eq!(bob.phase(), PairingPhase::PartnerResolveError);
    assert_eq!(failures(&bob.drain_events()), vec![FailureReason::PairingTimeout]);
}

#[tokio::test(start_paused = true)]
async fn retry_resolves_the_known_anchor() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    world.anchors.fail_next_resolve(AnchorFailure::Service(5));
    alice.command(Command::SetReadyToSetAnchor);
    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    assert_eq!(bob.phase(), PairingPhase::PartnerResolveError);
    bob.drain_events();

    bob.command(Command::RetryResolvingAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(bob.phase(), PairingPhase::Synced);
    assert!(failures(&bob.drain_events()).is_empty());
    assert!(!bob.coordinator().room().is_retrying());
}

#[tokio::test(start_paused = true)]
async fn host_syncs_after_partner_retry_succeeds() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    world.anchors.fail_next_resolve(AnchorFailure::Service(5));
    alice.command(Command::SetReadyToSetAnchor);
    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    assert_eq!(alice.phase(), PairingPhase::HostResolveError);

    bob.command(Command::RetryResolvingAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(bob.phase(), PairingPhase::Synced);
    assert_eq!(alice.phase(), PairingPhase::Synced);
    assert!(alice.coordinator().room().is_resolved());
    assert!(alice.coordinator().session().pairing_deadline.is_none());

    let line = stroke(&[(0.0, 0.0, 0.0), (0.0, 0.1, 0.0)]);
    bob.command(Command::UpdateStroke {
        stroke: line.clone(),
        remove: false,
    });
    pump_all(&mut [&mut alice, &mut bob]);

    let partner: Vec<_> = alice.view().partner_strokes.values().collect();
    assert_eq!(partner.len(), 1);
    assert_eq!(partner[0].points, line.points);
}

#[tokio::test(start_paused = true)]
async fn failed_retry_does_not_flag_the_room_until_timeout() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    world.anchors.fail_next_resolve(AnchorFailure::Service(5));
    alice.command(Command::SetReadyToSetAnchor);
    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);
    bob.drain_events();

    let key = bob.coordinator().room().current_key().cloned().unwrap();
    let error_path = bob.coordinator().config().anchor_error_path(&key);
    world.store.write(&error_path, Some(json!(false)));
    pump_all(&mut [&mut alice, &mut bob]);

    world.anchors.fail_next_resolve(AnchorFailure::Service(6));
    bob.command(Command::RetryResolvingAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(bob.phase(), PairingPhase::PartnerConnecting);
    assert!(failures(&bob.drain_events()).is_empty());
    assert_eq!(world.store.get(&error_path), Some(json!(false)));

    wait(61).await;
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(bob.phase(), PairingPhase::PartnerResolveError);
    assert_eq!(failures(&bob.drain_events()), vec![FailureReason::PairingTimeout]);
    assert_eq!(world.store.get(&error_path), Some(json!(true)));
}

#[tokio::test(start_paused = true)]
async fn retry_without_anchor_reports_no_anchor() {
    let world = SimWorld::new();
    let mut alice = world.device("alice");
    alice.command(Command::BeginPairing);
    alice.command(Command::RetryResolvingAnchor);
    alice.pump();

    assert_eq!(alice.phase(), PairingPhase::Looking);
    assert_eq!(failures(&alice.drain_events()), vec![FailureReason::NoAnchor]);
}

#[tokio::test(start_paused = true)]
async fn partner_leaving_mid_pairing_loses_the_connection() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    alice.drain_events();

    bob.store().disconnect();
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.phase(), PairingPhase::ConnectionLost);
    assert!(alice.saw(&PairingEvent::PartnerLost));
}

#[tokio::test(start_paused = true)]
async fn partner_leaving_after_sync_keeps_the_session() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = synced_pair(&world);
    alice.drain_events();

    bob.command(Command::LeaveRoom);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(bob.phase(), PairingPhase::Idle);
    assert_eq!(alice.phase(), PairingPhase::Synced);
    assert_eq!(count(&alice.drain_events(), &PairingEvent::PartnerLost), 1);
    assert!(!alice.view().partner_connected);
}

#[tokio::test(start_paused = true)]
async fn removed_anchor_resets_the_session() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = synced_pair(&world);
    let key = alice.coordinator().room().current_key().cloned().unwrap();
    let anchor_path = alice.coordinator().config().anchor_path(&key);

    world.store.write(&anchor_path, None);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.phase(), PairingPhase::Idle);
    assert_eq!(bob.phase(), PairingPhase::Idle);
    assert!(alice.saw(&PairingEvent::AnchorWasReset));
    assert!(alice.view().anchor_was_reset);
    assert!(alice.coordinator().room().current_key().is_none());
}

// ---------------------------------------------------------------------------
// Cancelling and reachability
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancel_leaves_the_candidate_room() {
    let world = SimWorld::new();
    let mut alice = world.device("alice");
    alice.command(Command::BeginPairing);
    alice.pump();
    let key = alice.coordinator().room().current_key().cloned().unwrap();
    let me = alice
        .coordinator()
        .config()
        .participant_path(&key, &ParticipantId::from("alice"));
    assert!(world.store.get(&me).is_some());

    alice.command(Command::CancelPairing);
    alice.pump();

    assert_eq!(alice.phase(), PairingPhase::Idle);
    assert!(world.store.get(&me).is_none());
    assert!(!world.medium.is_discovering(&PeerId::from("alice")));
    assert!(alice.coordinator().session().discovery_deadline.is_none());

    // the cancelled discovery deadline never fires
    wait(20).await;
    alice.pump();
    assert!(failures(&alice.drain_events()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn going_offline_tears_down_the_session() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = connected_pair(&world);
    alice.drain_events();

    alice.post(Input::Reachability(false));
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.phase(), PairingPhase::Offline);
    assert!(alice.saw(&PairingEvent::OfflineDetected));
    assert!(alice.coordinator().room().current_key().is_none());
    assert!(bob.saw(&PairingEvent::PartnerLost));

    alice.post(Input::Reachability(true));
    alice.pump();
    assert_eq!(alice.phase(), PairingPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn begin_while_offline_skips_the_candidate_room() {
    let world = SimWorld::new();
    let mut alice = world.device("alice");
    alice.post(Input::Reachability(false));
    alice.command(Command::BeginPairing);
    alice.pump();

    assert_eq!(alice.phase(), PairingPhase::Looking);
    assert!(alice.coordinator().room().current_key().is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_handling_inputs() {
    let world = SimWorld::new();
    let mut alice = world.device("alice");
    alice.command(Command::BeginPairing);
    alice.command(Command::Shutdown);
    alice.command(Command::BeginPairing);
    alice.pump();

    assert!(!alice.is_running());
    assert_eq!(alice.phase(), PairingPhase::Idle);
}

// ---------------------------------------------------------------------------
// Strokes
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn strokes_sync_without_echoes() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = synced_pair(&world);
    alice.drain_events();
    bob.drain_events();

    let mut line = stroke(&[(0.0, 0.0, 0.0), (0.1, 0.0, 0.0)]);
    alice.command(Command::UpdateStroke {
        stroke: line.clone(),
        remove: false,
    });
    line.push(Point3::new(0.2, 0.0, 0.0));
    alice.command(Command::UpdateStroke {
        stroke: line.clone(),
        remove: false,
    });
    pump_all(&mut [&mut alice, &mut bob]);

    let alice_events = alice.drain_events();
    assert_eq!(
        alice_events
            .iter()
            .filter(|e| matches!(e, PairingEvent::LocalStrokeAdded { .. }))
            .count(),
        1
    );
    assert!(!alice_events
        .iter()
        .any(|e| matches!(e, PairingEvent::PartnerStrokeAdded(_))));

    let partner: Vec<_> = bob.view().partner_strokes.values().collect();
    assert_eq!(partner.len(), 1);
    assert_eq!(partner[0].points, line.points);
    assert_eq!(partner[0].creator, Some(ParticipantId::from("alice")));
}

#[tokio::test(start_paused = true)]
async fn clearing_strokes_empties_both_devices() {
    let world = SimWorld::new();
    let (mut alice, mut bob) = synced_pair(&world);
    alice.command(Command::UpdateStroke {
        stroke: stroke(&[(0.0, 0.0, 0.0)]),
        remove: false,
    });
    pump_all(&mut [&mut alice, &mut bob]);
    assert_eq!(alice.view().local_strokes.len(), 1);
    assert_eq!(bob.view().partner_strokes.len(), 1);

    bob.command(Command::ClearAllStrokes);
    pump_all(&mut [&mut alice, &mut bob]);

    assert!(alice.view().local_strokes.is_empty());
    assert!(bob.view().partner_strokes.is_empty());
}

// ---------------------------------------------------------------------------
// Global room
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn global_session_resolves_existing_anchor() {
    let world = SimWorld::new();
    let pose = Pose::at(Point3::new(2.0, 0.0, 0.0));
    let anchor_id = seed_anchor(&world, pose);
    world
        .store
        .write("global_rooms/lobby", Some(json!("rooms/lobby")));
    world
        .store
        .write("rooms/lobby/anchor", Some(json!({ "anchorId": anchor_id })));

    let mut alice = world.device_with("alice", global_config(false), true);
    alice.command(Command::Begin);
    alice.pump();

    assert_eq!(alice.phase(), PairingPhase::Synced);
    assert_eq!(alice.view().anchor_pose, Some(pose));
    assert_eq!(world.store.get("rooms/lobby/anchor/anchorId"), Some(json!(anchor_id)));
}

#[tokio::test(start_paused = true)]
async fn global_session_without_anchor_reports_no_anchor() {
    let world = SimWorld::new();
    let mut alice = world.device_with("alice", global_config(false), true);
    alice.command(Command::Begin);
    alice.pump();

    assert_eq!(world.store.get("global_rooms/lobby"), Some(json!("lobby")));
    assert!(alice.coordinator().session().discovery_deadline.is_none());
    assert_eq!(alice.phase(), PairingPhase::GlobalNoAnchor);
    assert_eq!(failures(&alice.drain_events()), vec![FailureReason::NoAnchor]);
}

#[tokio::test(start_paused = true)]
async fn unreadable_global_pointer_fails_the_session() {
    let world = SimWorld::new();
    world.store.write("global_rooms/lobby", Some(json!(42)));
    let mut alice = world.device_with("alice", global_config(false), true);
    alice.command(Command::Begin);
    alice.pump();

    assert_eq!(alice.phase(), PairingPhase::GlobalNoAnchor);
    assert_eq!(
        failures(&alice.drain_events()),
        vec![FailureReason::GlobalRoomUnavailable]
    );
}

#[tokio::test(start_paused = true)]
async fn global_session_with_pairing_elects_and_syncs() {
    let world = SimWorld::new();
    let mut alice = world.device_with("alice", global_config(true), true);
    let mut bob = world.device_with("bob", global_config(true), true);
    alice.command(Command::Begin);
    pump_all(&mut [&mut alice, &mut bob]);
    bob.command(Command::Begin);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.role(), Role::Host);
    assert_eq!(bob.role(), Role::Partner);

    alice.command(Command::SetReadyToSetAnchor);
    bob.command(Command::SetReadyToSetAnchor);
    pump_all(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.phase(), PairingPhase::Synced);
    assert_eq!(bob.phase(), PairingPhase::Synced);
}
