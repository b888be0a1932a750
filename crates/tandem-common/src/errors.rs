use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures raised inside the pairing core.
///
/// These never cross the coordinator boundary as-is: the coordinators
/// translate them into `PairingEvent`s with a stable reason code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairingError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("store not ready: {0}")]
    StoreNotReady(String),

    #[error("anchor host failed: {0}")]
    AnchorHost(String),

    #[error("anchor resolve failed: {0}")]
    AnchorResolve(String),

    #[error("no peer connected within {0}s")]
    DiscoveryTimeout(u64),

    #[error("anchor handshake did not finish within {0}s")]
    PairingTimeout(u64),

    #[error("malformed peer payload: {0}")]
    MalformedPeerPayload(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TandemError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
