//! The per-device serialized inbox.
//!
//! Every callback from the discovery channel, the anchor service, the
//! replicated store, the timers and the caller is posted here as one
//! [`Input`]. The coordinator consumes inputs one at a time, so handlers
//! always run with exclusive access to coordinator state.

use tokio::sync::mpsc;
use tracing::trace;

use crate::pairing::Command;
use crate::services::{AnchorOutcome, DiscoveryEvent, StoreEvent};
use crate::timer::TimerKind;

/// One unit of work for the coordinator.
#[derive(Debug, Clone)]
pub enum Input {
    Command(Command),
    Discovery(DiscoveryEvent),
    /// Outcome from the anchor session created in `epoch`.
    Anchor { epoch: u64, outcome: AnchorOutcome },
    Store(StoreEvent),
    Timer { kind: TimerKind, generation: u64 },
    /// Network reachability changed.
    Reachability(bool),
}

/// Cloneable sending half of a device's inbox.
#[derive(Debug, Clone)]
pub struct Inbox {
    tx: mpsc::UnboundedSender<Input>,
}

impl Inbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Input>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Post an input. Never blocks; inputs posted after shutdown are dropped.
    pub fn post(&self, input: Input) {
        if self.tx.send(input).is_err() {
            trace!("inbox closed, input dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
