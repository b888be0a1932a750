//! Replicated room store configuration.

use serde::{Deserialize, Serialize};

/// Store layout and readiness policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound on waiting for the store to become ready, in seconds.
    pub ready_wait_cap_secs: u32,
    /// Poll interval while waiting for readiness, in milliseconds.
    pub ready_poll_interval_ms: u32,
    /// Root node under which rooms are created.
    pub rooms_root: String,
    /// Display name written into every room created by this device.
    pub display_name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ready_wait_cap_secs: 10,
            ready_poll_interval_ms: 500,
            rooms_root: "rooms".into(),
            display_name: "Tandem".into(),
        }
    }
}
