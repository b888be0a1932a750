//! Pairing and synchronization core for two-device shared drawing.
//!
//! Two nearby devices discover each other, agree on one room in a
//! replicated store, elect a host, establish a shared anchor through a
//! remote anchor service, and then keep their strokes in sync.
//!
//! The core is split into three coordinators, leaves first:
//!
//! - [`strokes::StrokeSyncEngine`] reconciles local and remote stroke
//!   writes, one authoritative writer per stroke.
//! - [`room::RoomCoordinator`] owns one room's lifecycle in the store:
//!   creation and joining, the participant roster, the anchor record.
//! - [`pairing::PairingCoordinator`] is the top-level state machine that
//!   drives discovery, role election, the anchor handshake and timeouts.
//!
//! All external collaborators sit behind the traits in [`services`], and
//! every callback they produce is funnelled through one serialized
//! [`Inbox`] per device. [`memory`] provides in-process implementations
//! of all three services for tests and the simulator.

pub mod config;
pub mod election;
pub mod inbox;
pub mod memory;
pub mod pairing;
pub mod presentation;
pub mod protocol;
pub mod room;
pub mod services;
pub mod strokes;
pub mod timer;

pub use config::PairingConfig;
pub use inbox::{Inbox, Input};
pub use pairing::{
    Command, FailureReason, PairingCoordinator, PairingEvent, PairingHandle, PairingPhase,
    PairingRuntime, PairingSession, Role, Services,
};
pub use presentation::{ButtonState, PairingView};
pub use protocol::RoomData;
pub use strokes::{LocalStroke, PartnerStroke, StrokeHandle, StrokeStyle};
