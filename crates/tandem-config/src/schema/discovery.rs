//! Nearby peer discovery configuration.

use serde::{Deserialize, Serialize};

/// Peer discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Service identifier advertised on the discovery channel.
    pub service_id: String,
    /// Seconds to wait for a peer before giving up (valid range: 1-120).
    pub timeout_secs: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_id: "dev.tandem.nearby".into(),
            timeout_secs: 10,
        }
    }
}
