//! Runs a coordinator on its own task.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::coordinator::{PairingCoordinator, Services};
use super::types::{Command, PairingEvent};
use crate::config::PairingConfig;
use crate::inbox::{Inbox, Input};
use crate::strokes::LocalStroke;

/// Spawns the inbox loop for one device.
pub struct PairingRuntime;

impl PairingRuntime {
    /// Start a coordinator consuming `inputs`.
    ///
    /// `inbox` must be the sending half of `inputs`; service
    /// implementations in `services` should post to clones of it.
    pub fn spawn(
        config: PairingConfig,
        services: Services,
        inbox: Inbox,
        mut inputs: mpsc::UnboundedReceiver<Input>,
    ) -> (
        PairingHandle,
        mpsc::UnboundedReceiver<PairingEvent>,
        JoinHandle<()>,
    ) {
        let handle = PairingHandle {
            inbox: inbox.clone(),
        };
        let (mut coordinator, events) = PairingCoordinator::new(config, services, inbox);

        let task = tokio::spawn(async move {
            info!("Pairing runtime started");
            while let Some(input) = inputs.recv().await {
                if !coordinator.handle(input) {
                    break;
                }
            }
            debug!(phase = %coordinator.phase(), "Pairing runtime stopped");
        });

        (handle, events, task)
    }
}

/// Cloneable caller-side handle to a running coordinator.
#[derive(Debug, Clone)]
pub struct PairingHandle {
    inbox: Inbox,
}

impl PairingHandle {
    pub fn send(&self, command: Command) {
        self.inbox.post(Input::Command(command));
    }

    pub fn begin(&self) {
        self.send(Command::Begin);
    }

    pub fn begin_pairing(&self) {
        self.send(Command::BeginPairing);
    }

    pub fn begin_global_session(&self, with_pairing: bool) {
        self.send(Command::BeginGlobalSession { with_pairing });
    }

    pub fn set_ready_to_set_anchor(&self) {
        self.send(Command::SetReadyToSetAnchor);
    }

    pub fn retry_resolving_anchor(&self) {
        self.send(Command::RetryResolvingAnchor);
    }

    pub fn cancel_pairing(&self) {
        self.send(Command::CancelPairing);
    }

    pub fn leave_room(&self) {
        self.send(Command::LeaveRoom);
    }

    pub fn resume_session(&self) {
        self.send(Command::ResumeSession);
    }

    pub fn set_global_room_name(&self, name: impl Into<String>) {
        self.send(Command::SetGlobalRoomName(name.into()));
    }

    pub fn update_stroke(&self, stroke: LocalStroke, remove: bool) {
        self.send(Command::UpdateStroke { stroke, remove });
    }

    pub fn clear_all_strokes(&self) {
        self.send(Command::ClearAllStrokes);
    }

    /// Report a network reachability change.
    pub fn set_reachable(&self, reachable: bool) {
        self.inbox.post(Input::Reachability(reachable));
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// Whether the runtime has stopped consuming inputs.
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }
}
