//! Bounded, newest-first log of recent events.

use pulse_types::ActivityEvent;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 50;

/// Keeps the most recent events, valid and error alike.
#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    entries: Arc<Mutex<VecDeque<ActivityEvent>>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ActivityEvent>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            tracing::error!("event log lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn push(&self, event: ActivityEvent) {
        let mut entries = self.lock();
        entries.push_front(event);
        entries.truncate(self.capacity);
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<ActivityEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub async fn run_consumer(self, mut events: broadcast::Receiver<ActivityEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.push(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event log lagged; events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
