//! Room coordination: one room's lifecycle in the replicated store.
//!
//! - `manager`: [`RoomCoordinator`], creation/joining, roster, anchor record
//! - `policy`: peer-paired vs. global room discovery
//! - `subscriptions`: the owned active-subscription set
//! - `types`: [`RoomSignal`] and internal bookkeeping

mod manager;
mod policy;
mod subscriptions;
mod types;


pub use manager::RoomCoordinator;
pub use policy::{policy_for, GlobalRoomPolicy, PeerRoomPolicy, RoomDiscoveryPolicy, RoomEntry};
pub use types::RoomSignal;
