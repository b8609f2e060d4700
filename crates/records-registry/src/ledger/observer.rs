//! Event observers — external consumers of ledger notifications.
//!
//! Observers are invoked after an event is durably committed, in commit
//! order, exactly once per event. They cannot veto or fail a commit.

use std::sync::mpsc::Sender;
use std::sync::Mutex;

use super::event::LedgerEvent;

/// Receives every committed ledger event.
///
/// Called while the service holds its write lock: an observer must not
/// call back into the same service.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &LedgerEvent);
}

impl<F> EventObserver for F
where
    F: Fn(&LedgerEvent) + Send + Sync,
{
    fn on_event(&self, event: &LedgerEvent) {
        self(event)
    }
}

/// Collects events in memory. Useful for auditors and tests.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event seen so far.
    pub fn events(&self) -> Vec<LedgerEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventObserver for MemoryObserver {
    fn on_event(&self, event: &LedgerEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Forwards events over an mpsc channel to an indexer thread.
pub struct ChannelObserver {
    sender: Mutex<Sender<LedgerEvent>>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<LedgerEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl EventObserver for ChannelObserver {
    fn on_event(&self, event: &LedgerEvent) {
        let sent = match self.sender.lock() {
            Ok(sender) => sender.send(event.clone()).is_ok(),
            Err(_) => false,
        };
        if !sent {
            log::debug!("event observer channel closed, dropping {}", event.name());
        }
    }
}
