//! Simulated devices wired to the in-memory services.

use tandem_common::{ParticipantId, PeerId};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{MemoryAnchorCloud, MemoryMedium, MemoryStoreBackend, MemoryTracking, StoreControl};
use crate::config::PairingConfig;
use crate::inbox::{Inbox, Input};
use crate::pairing::{Command, PairingCoordinator, PairingEvent, PairingPhase, Role, Services};
use crate::presentation::PairingView;

/// The shared world simulated devices live in: one store, one radio
/// medium, one anchor cloud.
#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    pub store: MemoryStoreBackend,
    pub medium: MemoryMedium,
    pub anchors: MemoryAnchorCloud,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signed-in device with default configuration.
    pub fn device(&self, name: &str) -> SimDevice {
        self.device_with(name, PairingConfig::default(), true)
    }

    /// A device whose participant id and peer id are both `name`.
    pub fn device_with(&self, name: &str, config: PairingConfig, store_ready: bool) -> SimDevice {
        let (inbox, inputs) = Inbox::channel();
        let store = self
            .store
            .connect(ParticipantId::from(name), inbox.clone(), store_ready);
        let control = store.control();
        let tracking = MemoryTracking::default();
        let services = Services {
            discovery: Box::new(self.medium.endpoint(PeerId::from(name), inbox.clone())),
            anchors: Box::new(self.anchors.service()),
            tracking: Box::new(tracking.clone()),
            store: Box::new(store),
        };
        let (coordinator, events) = PairingCoordinator::new(config, services, inbox.clone());
        SimDevice {
            name: name.to_string(),
            coordinator,
            inbox,
            inputs,
            events,
            control,
            tracking,
            view: PairingView::default(),
            log: Vec::new(),
            running: true,
        }
    }
}

/// One device: a coordinator plus the ends of its channels.
pub struct SimDevice {
    name: String,
    coordinator: PairingCoordinator,
    inbox: Inbox,
    inputs: UnboundedReceiver<Input>,
    events: UnboundedReceiver<PairingEvent>,
    control: StoreControl,
    tracking: MemoryTracking,
    view: PairingView,
    log: Vec<PairingEvent>,
    running: bool,
}

impl SimDevice {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn post(&self, input: Input) {
        self.inbox.post(input);
    }

    pub fn command(&self, command: Command) {
        self.post(Input::Command(command));
    }

    /// Handle every queued input. Returns whether anything was handled.
    pub fn pump(&mut self) -> bool {
        let mut handled = false;
        while self.running {
            let Ok(input) = self.inputs.try_recv() else {
                break;
            };
            handled = true;
            self.running = self.coordinator.handle(input);
            self.collect();
        }
        handled
    }

    fn collect(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.view.apply(&event);
            self.log.push(event);
        }
    }

    /// Take every event seen since the last call.
    pub fn drain_events(&mut self) -> Vec<PairingEvent> {
        self.collect();
        std::mem::take(&mut self.log)
    }

    /// Whether `event` is among the events not yet drained.
    pub fn saw(&self, event: &PairingEvent) -> bool {
        self.log.contains(event)
    }

    pub fn phase(&self) -> PairingPhase {
        self.coordinator.phase()
    }

    pub fn role(&self) -> Role {
        self.coordinator.role()
    }

    pub fn coordinator(&self) -> &PairingCoordinator {
        &self.coordinator
    }

    pub fn view(&self) -> &PairingView {
        &self.view
    }

    pub fn store(&self) -> &StoreControl {
        &self.control
    }

    pub fn tracking(&self) -> &MemoryTracking {
        &self.tracking
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Pump every device until none has anything left to handle.
pub fn pump_all(devices: &mut [&mut SimDevice]) {
    loop {
        let mut progressed = false;
        for device in devices.iter_mut() {
            progressed |= device.pump();
        }
        if !progressed {
            break;
        }
    }
}
