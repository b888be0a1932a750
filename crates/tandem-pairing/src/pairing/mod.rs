//! Pairing: the top-level state machine and the task that runs it.
//!
//! - `types`: roles, phases, commands, events
//! - `coordinator`: [`PairingCoordinator`], one device's state machine
//! - `runtime`: [`PairingRuntime`] and its [`PairingHandle`]

mod coordinator;
mod runtime;
mod types;

#[cfg(test)]
mod tests;

pub use coordinator::{PairingCoordinator, Services};
pub use runtime::{PairingHandle, PairingRuntime};
pub use types::{Command, FailureReason, PairingEvent, PairingPhase, PairingSession, Role};
