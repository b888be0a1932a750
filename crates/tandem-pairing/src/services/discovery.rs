//! Nearby peer discovery channel.

use tandem_common::{PairingError, PeerId};

/// What a device advertises while looking for a partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub service_id: String,
    pub endpoint_name: String,
}

/// Callbacks from the discovery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    PeerFound(PeerId),
    PeerLost(PeerId),
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    ConnectFailed { peer: PeerId, reason: String },
    DataReceived { from: PeerId, payload: Vec<u8> },
}

/// Advertise, discover and connect to one nearby device, then exchange
/// opaque payloads with it.
pub trait DiscoveryChannel: Send {
    /// Start advertising and discovering.
    fn start(&mut self, advertisement: Advertisement) -> Result<(), PairingError>;

    /// Stop looking for new peers. Established connections stay up.
    fn stop_discovery(&mut self);

    /// Stop everything and drop all connections.
    fn stop(&mut self);

    /// Request a connection. `false` if the request could not be issued.
    fn connect(&mut self, peer: &PeerId) -> bool;

    /// Fire-and-forget send to a connected peer.
    fn send(&mut self, payload: Vec<u8>, peer: &PeerId);
}
