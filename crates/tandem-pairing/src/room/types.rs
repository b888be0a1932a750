//! Signals and bookkeeping types for the room coordinator.

use tandem_common::RoomKey;

use crate::protocol::RoomData;
use crate::strokes::StrokeEvent;

/// What the room coordinator reports upward. Drained by the pairing
/// coordinator after every input.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomSignal {
    /// A candidate room was created and can be announced to peers.
    RoomCreated(RoomData),
    /// A room was joined and the local participant registered.
    RoomJoined(RoomData),
    /// First pairing partner appeared; roles are elected.
    PartnerJoined { is_host: bool },
    /// The partner's readiness to set the anchor changed.
    PartnerReadiness(bool),
    /// Host only: the partner finished resolving the anchor.
    PartnerResolved,
    /// A fresh anchor id appeared and this device must resolve it.
    AnchorIdCreated(String),
    /// Some device reported it could not resolve the anchor.
    AnchorErrorReported,
    /// The room has no anchor and nobody will create one.
    AnchorMissing,
    /// The anchor record was removed from a resolved room.
    AnchorNotAvailable,
    /// No participants left besides this device.
    PartnerLost,
    /// A participant disappeared while still pairing.
    ConnectionLost,
    /// The global room pointer could not be read or is not a room name.
    GlobalRoomUnavailable(String),
    Stroke(StrokeEvent),
}

/// Room operations deferred until the store is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PendingOp {
    CreateRoom,
    JoinRoom(RoomData),
    FindGlobalRoom,
}

/// Which feed a subscription belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Feed {
    Participants,
    RoomChildren,
    Anchor,
    Strokes,
}

/// Outstanding store requests owned by the room coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RoomRequest {
    ReadGlobalPointer,
    ClaimGlobalPointer(RoomKey),
}
