//! Anchor handshake deadline configuration.

use serde::{Deserialize, Serialize};

/// Pairing timeout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingTimeoutConfig {
    /// Seconds allowed for host/resolve of the shared anchor (valid range: 5-600).
    pub timeout_secs: u32,
}

impl Default for PairingTimeoutConfig {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}
