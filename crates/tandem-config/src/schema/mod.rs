//! Configuration schema types for Tandem.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults the pairing core expects.

mod discovery;
mod logging;
mod pairing;
mod room;
mod store;

pub use discovery::*;
pub use logging::*;
pub use pairing::*;
pub use room::*;
pub use store::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Tandem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct TandemConfig {
    pub discovery: DiscoveryConfig,
    pub pairing: PairingTimeoutConfig,
    pub store: StoreConfig,
    pub room: RoomConfig,
    pub logging: LoggingConfig,
}
