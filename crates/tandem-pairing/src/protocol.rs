//! Wire formats shared by both devices.
//!
//! Two formats cross device boundaries: the peer-discovery payload that
//! announces a candidate room, and the JSON records stored under a room
//! in the replicated store.

use serde::{Deserialize, Serialize};
use tandem_common::{PairingError, RoomKey};

// ---------------------------------------------------------------------------
// Store keys
// ---------------------------------------------------------------------------

pub const PARTICIPANTS: &str = "participants";
pub const ANCHOR: &str = "anchor";
pub const LINES: &str = "lines";
pub const POINTS: &str = "points";
pub const ANCHOR_RESOLUTION_ERROR: &str = "anchorResolutionError";

// ---------------------------------------------------------------------------
// Peer payload
// ---------------------------------------------------------------------------

/// A candidate room announced over the discovery channel.
///
/// Encoded as UTF-8 `"<roomKey>,<timestampMillis>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomData {
    pub key: RoomKey,
    pub timestamp: i64,
}

impl RoomData {
    pub fn new(key: RoomKey, timestamp: i64) -> Self {
        Self { key, timestamp }
    }

    pub fn encode(&self) -> String {
        format!("{},{}", self.key, self.timestamp)
    }

    pub fn to_payload(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }

    /// Parse `"<roomKey>,<timestampMillis>"`.
    ///
    /// Anything other than exactly two fields, an empty key, or a
    /// non-numeric timestamp is rejected.
    pub fn decode(text: &str) -> Result<Self, PairingError> {
        let fields: Vec<&str> = text.split(',').collect();
        let [key, timestamp] = fields.as_slice() else {
            return Err(PairingError::MalformedPeerPayload(format!(
                "expected 2 fields, got {}",
                fields.len()
            )));
        };
        if key.is_empty() {
            return Err(PairingError::MalformedPeerPayload("empty room key".into()));
        }
        let timestamp = timestamp.parse::<i64>().map_err(|e| {
            PairingError::MalformedPeerPayload(format!("bad timestamp {timestamp:?}: {e}"))
        })?;
        Ok(Self {
            key: RoomKey::from(*key),
            timestamp,
        })
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, PairingError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| PairingError::MalformedPeerPayload(format!("not UTF-8: {e}")))?;
        Self::decode(text)
    }
}

// ---------------------------------------------------------------------------
// Store records
// ---------------------------------------------------------------------------

/// Room metadata written by the creating device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMeta {
    pub updated_at_timestamp: i64,
    pub display_name: String,
}

/// One device's entry in a room's roster. Written only by that device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticipantRecord {
    pub ready_to_set_anchor: bool,
    pub anchor_resolved: bool,
    pub is_pairing: bool,
}

impl ParticipantRecord {
    pub fn joining(is_pairing: bool) -> Self {
        Self {
            is_pairing,
            ..Self::default()
        }
    }
}

/// The room's shared anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnchorRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_id: Option<String>,
    pub anchor_resolution_error: bool,
}

impl AnchorRecord {
    pub fn with_id(anchor_id: impl Into<String>) -> Self {
        Self {
            anchor_id: Some(anchor_id.into()),
            anchor_resolution_error: false,
        }
    }

    pub fn failed() -> Self {
        Self {
            anchor_id: None,
            anchor_resolution_error: true,
        }
    }
}

/// Serialize a record into a store value.
pub(crate) fn to_value<T: Serialize>(record: &T) -> Option<serde_json::Value> {
    serde_json::to_value(record).ok()
}
