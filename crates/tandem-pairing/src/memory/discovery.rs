//! In-memory nearby-connections medium.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tandem_common::{PairingError, PeerId};
use tracing::{debug, warn};

use crate::inbox::{Inbox, Input};
use crate::services::{Advertisement, DiscoveryChannel, DiscoveryEvent};

#[derive(Debug)]
struct Endpoint {
    inbox: Inbox,
    service: Option<String>,
    advertising: bool,
    discovering: bool,
    connected: BTreeSet<PeerId>,
}

impl Endpoint {
    fn post(&self, event: DiscoveryEvent) {
        self.inbox.post(Input::Discovery(event));
    }
}

#[derive(Debug, Default)]
struct MediumState {
    endpoints: BTreeMap<PeerId, Endpoint>,
}

/// The radio space shared by simulated devices.
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    inner: Arc<Mutex<MediumState>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MediumState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a device on the medium.
    pub fn endpoint(&self, peer: PeerId, inbox: Inbox) -> MemoryDiscovery {
        self.lock().endpoints.insert(
            peer.clone(),
            Endpoint {
                inbox,
                service: None,
                advertising: false,
                discovering: false,
                connected: BTreeSet::new(),
            },
        );
        MemoryDiscovery {
            medium: self.clone(),
            peer,
        }
    }

    pub fn is_discovering(&self, peer: &PeerId) -> bool {
        self.lock()
            .endpoints
            .get(peer)
            .is_some_and(|endpoint| endpoint.discovering)
    }

    pub fn connections(&self, peer: &PeerId) -> Vec<PeerId> {
        self.lock()
            .endpoints
            .get(peer)
            .map(|endpoint| endpoint.connected.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Break the link between two peers, notifying both.
    pub fn sever(&self, a: &PeerId, b: &PeerId) {
        let mut state = self.lock();
        let linked = state
            .endpoints
            .get_mut(a)
            .is_some_and(|endpoint| endpoint.connected.remove(b));
        if let Some(endpoint) = state.endpoints.get_mut(b) {
            endpoint.connected.remove(a);
        }
        if linked {
            if let Some(endpoint) = state.endpoints.get(a) {
                endpoint.post(DiscoveryEvent::PeerDisconnected(b.clone()));
            }
            if let Some(endpoint) = state.endpoints.get(b) {
                endpoint.post(DiscoveryEvent::PeerDisconnected(a.clone()));
            }
        }
    }
}

/// One device's view of a [`MemoryMedium`].
#[derive(Debug)]
pub struct MemoryDiscovery {
    medium: MemoryMedium,
    peer: PeerId,
}

impl MemoryDiscovery {
    pub fn peer_id(&self) -> &PeerId {
        &self.peer
    }
}

impl DiscoveryChannel for MemoryDiscovery {
    fn start(&mut self, advertisement: Advertisement) -> Result<(), PairingError> {
        let mut state = self.medium.lock();
        let me = self.peer.clone();
        let Some(endpoint) = state.endpoints.get_mut(&me) else {
            return Err(PairingError::Transport(format!("{me} is not on the medium")));
        };
        endpoint.service = Some(advertisement.service_id.clone());
        endpoint.advertising = true;
        endpoint.discovering = true;

        for (other, endpoint) in &state.endpoints {
            if *other == me || endpoint.service.as_deref() != Some(&advertisement.service_id) {
                continue;
            }
            if endpoint.advertising {
                if let Some(mine) = state.endpoints.get(&me) {
                    mine.post(DiscoveryEvent::PeerFound(other.clone()));
                }
            }
            if endpoint.discovering {
                endpoint.post(DiscoveryEvent::PeerFound(me.clone()));
            }
        }
        debug!(peer = %me, service = %advertisement.service_id, "Advertising and discovering");
        Ok(())
    }

    fn stop_discovery(&mut self) {
        if let Some(endpoint) = self.medium.lock().endpoints.get_mut(&self.peer) {
            endpoint.advertising = false;
            endpoint.discovering = false;
        }
    }

    fn stop(&mut self) {
        self.stop_discovery();
        let peers = self.medium.connections(&self.peer);
        for other in peers {
            let mut state = self.medium.lock();
            if let Some(endpoint) = state.endpoints.get_mut(&self.peer) {
                endpoint.connected.remove(&other);
            }
            if let Some(endpoint) = state.endpoints.get_mut(&other) {
                endpoint.connected.remove(&self.peer);
                endpoint.post(DiscoveryEvent::PeerDisconnected(self.peer.clone()));
            }
        }
    }

    fn connect(&mut self, peer: &PeerId) -> bool {
        let mut state = self.medium.lock();
        let reachable = state
            .endpoints
            .get(peer)
            .is_some_and(|endpoint| endpoint.advertising || endpoint.connected.contains(&self.peer));
        if !reachable {
            warn!(from = %self.peer, to = %peer, "Connect request to unreachable peer");
            return false;
        }
        let newly_linked = state
            .endpoints
            .get_mut(&self.peer)
            .is_some_and(|endpoint| endpoint.connected.insert(peer.clone()));
        if !newly_linked {
            return true;
        }
        if let Some(endpoint) = state.endpoints.get_mut(peer) {
            endpoint.connected.insert(self.peer.clone());
            endpoint.post(DiscoveryEvent::PeerConnected(self.peer.clone()));
        }
        if let Some(endpoint) = state.endpoints.get(&self.peer) {
            endpoint.post(DiscoveryEvent::PeerConnected(peer.clone()));
        }
        true
    }

    fn send(&mut self, payload: Vec<u8>, peer: &PeerId) {
        let state = self.medium.lock();
        let connected = state
            .endpoints
            .get(&self.peer)
            .is_some_and(|endpoint| endpoint.connected.contains(peer));
        match state.endpoints.get(peer) {
            Some(endpoint) if connected => endpoint.post(DiscoveryEvent::DataReceived {
                from: self.peer.clone(),
                payload,
            }),
            _ => debug!(from = %self.peer, to = %peer, "Dropping payload for unconnected peer"),
        }
    }
}
