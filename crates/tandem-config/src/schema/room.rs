//! Room discovery mode configuration.

use serde::{Deserialize, Serialize};

/// How a device finds the room it draws in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum RoomMode {
    /// Discover a nearby peer and agree on one of the two candidate rooms.
    #[default]
    Paired,
    /// Join one well-known shared room.
    Global,
}

/// Room discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub mode: RoomMode,
    /// In global mode, still run host election and the anchor handshake.
    pub with_pairing: bool,
    /// Root node holding the global room pointers.
    pub global_root: String,
    /// Name of the global room pointer (and the canonical room key).
    pub global_room_name: String,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            mode: RoomMode::Paired,
            with_pairing: false,
            global_root: "global_rooms".into(),
            global_room_name: "global_room_0".into(),
        }
    }
}
