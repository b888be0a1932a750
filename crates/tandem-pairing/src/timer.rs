//! One-shot, re-armable timers that fire into the inbox.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::inbox::{Inbox, Input};

/// Which deadline a timer guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// No peer connected in time.
    Discovery,
    /// Anchor handshake did not finish in time.
    Pairing,
    /// Poll the store for readiness.
    StoreWaitPoll,
    /// Give up waiting for the store and proceed anyway.
    StoreWaitCap,
}

/// A one-shot timer.
///
/// Arming spawns a sleep task that posts `Input::Timer` with the current
/// generation. Re-arming or cancelling invalidates any firing already in
/// flight, so [`Timer::fire`] accepts each arming at most once.
#[derive(Debug)]
pub struct Timer {
    kind: TimerKind,
    generation: u64,
    task: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            generation: 0,
            task: None,
            deadline: None,
        }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    /// Arm the timer, replacing any previous arming.
    pub fn arm(&mut self, after: Duration, inbox: &Inbox) {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let kind = self.kind;
        let inbox = inbox.clone();
        self.deadline = Some(Instant::now() + after);
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            inbox.post(Input::Timer { kind, generation });
        }));
    }

    /// Arm only if not already armed.
    pub fn arm_if_idle(&mut self, after: Duration, inbox: &Inbox) {
        if !self.is_armed() {
            self.arm(after, inbox);
        }
    }

    /// Cancel the timer. Safe to call at any time.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.deadline = None;
    }

    /// Accept a firing. Returns `false` for firings of a cancelled or
    /// superseded arming.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.task.is_some() && generation == self.generation {
            self.task = None;
            self.deadline = None;
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn next_firing(rx: &mut UnboundedReceiver<Input>) -> Option<u64> {
        match rx.recv().await {
            Some(Input::Timer { generation, .. }) => Some(generation),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_duration() {
        let (inbox, mut rx) = Inbox::channel();
        let mut timer = Timer::new(TimerKind::Discovery);
        timer.arm(Duration::from_secs(10), &inbox);
        assert!(timer.is_armed());
        assert!(timer.deadline().is_some());

        let generation = next_firing(&mut rx).await.unwrap();
        assert!(timer.fire(generation));
        assert!(!timer.fire(generation));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_suppresses_firing() {
        let (inbox, mut rx) = Inbox::channel();
        let mut timer = Timer::new(TimerKind::Pairing);
        timer.arm(Duration::from_secs(1), &inbox);
        timer.cancel();
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        assert!(timer.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_invalidates_old_generation() {
        let (inbox, mut rx) = Inbox::channel();
        let mut timer = Timer::new(TimerKind::Pairing);
        timer.arm(Duration::from_secs(1), &inbox);
        let stale = timer.generation;
        timer.arm(Duration::from_secs(5), &inbox);

        let generation = next_firing(&mut rx).await.unwrap();
        assert_ne!(generation, stale);
        assert!(!timer.fire(stale));
        assert!(timer.fire(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn arm_if_idle_keeps_existing_deadline() {
        let (inbox, _rx) = Inbox::channel();
        let mut timer = Timer::new(TimerKind::StoreWaitCap);
        timer.arm(Duration::from_secs(10), &inbox);
        let deadline = timer.deadline();
        tokio::time::advance(Duration::from_secs(1)).await;
        timer.arm_if_idle(Duration::from_secs(10), &inbox);
        assert_eq!(timer.deadline(), deadline);
    }
}
