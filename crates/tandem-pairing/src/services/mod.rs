//! Seams to the three external collaborators, plus AR tracking.
//!
//! Every trait method is synchronous and returns immediately. Outcomes
//! are delivered later as [`Input`](crate::Input)s posted to the
//! device's inbox by the implementation.

mod anchor;
mod discovery;
mod store;

pub use anchor::{
    AnchorFailure, AnchorOutcome, AnchorService, AnchorSession, AnchorSink, TrackingSource,
};
pub use discovery::{Advertisement, DiscoveryChannel, DiscoveryEvent};
pub use store::{ChildChange, ObserveKind, RequestId, RoomStore, StoreEvent, SubscriptionId};
