//! Runtime view of the pairing configuration.
//!
//! `tandem-config` describes what is on disk; [`PairingConfig`] is what the
//! coordinators consume: durations instead of raw integers, plus helpers
//! that build every store path the core touches.

use std::time::Duration;

use tandem_common::{ParticipantId, RoomKey, StrokeId};
use tandem_config::{RoomMode, TandemConfig};

use crate::protocol::{ANCHOR, ANCHOR_RESOLUTION_ERROR, LINES, PARTICIPANTS};

/// Policy and layout used by the pairing core.
#[derive(Debug, Clone)]
pub struct PairingConfig {
    pub service_id: String,
    pub discovery_timeout: Duration,
    pub pairing_timeout: Duration,
    pub store_ready_cap: Duration,
    pub store_ready_poll: Duration,
    pub rooms_root: String,
    pub display_name: String,
    pub mode: RoomMode,
    pub with_pairing: bool,
    pub global_root: String,
    pub global_room_name: String,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self::from_settings(&TandemConfig::default())
    }
}

impl PairingConfig {
    /// Build the runtime view from the on-disk schema.
    pub fn from_settings(settings: &TandemConfig) -> Self {
        Self {
            service_id: settings.discovery.service_id.clone(),
            discovery_timeout: Duration::from_secs(u64::from(settings.discovery.timeout_secs)),
            pairing_timeout: Duration::from_secs(u64::from(settings.pairing.timeout_secs)),
            store_ready_cap: Duration::from_secs(u64::from(settings.store.ready_wait_cap_secs)),
            store_ready_poll: Duration::from_millis(u64::from(
                settings.store.ready_poll_interval_ms,
            )),
            rooms_root: settings.store.rooms_root.clone(),
            display_name: settings.store.display_name.clone(),
            mode: settings.room.mode,
            with_pairing: settings.room.with_pairing,
            global_root: settings.room.global_root.clone(),
            global_room_name: settings.room.global_room_name.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Store paths
    // -----------------------------------------------------------------------

    pub fn room_path(&self, room: &RoomKey) -> String {
        format!("{}/{}", self.rooms_root, room)
    }

    pub fn participants_path(&self, room: &RoomKey) -> String {
        format!("{}/{}", self.room_path(room), PARTICIPANTS)
    }

    pub fn participant_path(&self, room: &RoomKey, participant: &ParticipantId) -> String {
        format!("{}/{}", self.participants_path(room), participant)
    }

    pub fn anchor_path(&self, room: &RoomKey) -> String {
        format!("{}/{}", self.room_path(room), ANCHOR)
    }

    pub fn anchor_error_path(&self, room: &RoomKey) -> String {
        format!("{}/{}", self.anchor_path(room), ANCHOR_RESOLUTION_ERROR)
    }

    pub fn lines_path(&self, room: &RoomKey) -> String {
        format!("{}/{}", self.room_path(room), LINES)
    }

    pub fn stroke_path(&self, room: &RoomKey, stroke: &StrokeId) -> String {
        format!("{}/{}", self.lines_path(room), stroke)
    }

    /// Path of the well-known pointer naming the shared global room.
    pub fn global_pointer_path(&self) -> String {
        format!("{}/{}", self.global_root, self.global_room_name)
    }
}
