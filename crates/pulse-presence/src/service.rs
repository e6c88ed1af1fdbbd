//! Shared registry handle and its background tasks.
//!
//! Includes:
//! - The event consumer that upserts actors from the activity stream.
//! - The periodic aging sweep that demotes idle actors to away.

use crate::registry::{PresenceActor, PresenceRegistry, RegistryConfig};
use pulse_types::{now_millis, ActivityEvent};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

/// Default interval between aging sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Cloneable handle to one session's presence registry.
///
/// All clones share the same registry behind a single mutex, so the
/// read-modify-write on slot occupancy stays atomic under the
/// multi-threaded runtime. The lock is never held across an `.await`.
#[derive(Clone, Debug, Default)]
pub struct PresenceService {
    registry: Arc<Mutex<PresenceRegistry>>,
}

impl PresenceService {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            registry: Arc::new(Mutex::new(PresenceRegistry::new(config))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PresenceRegistry> {
        self.registry.lock().unwrap_or_else(|poisoned| {
            tracing::error!("presence registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Applies one event from the stream at time `now_ms`.
    ///
    /// Error-kind events never touch the registry.
    pub fn apply_at(&self, event: &ActivityEvent, now_ms: i64) -> Option<PresenceActor> {
        if event.is_error() {
            return None;
        }
        Some(
            self.lock()
                .upsert(&event.actor_id, &event.display_name, now_ms),
        )
    }

    pub fn apply(&self, event: &ActivityEvent) -> Option<PresenceActor> {
        self.apply_at(event, now_millis())
    }

    pub fn upsert(&self, actor_id: &str, display_name: &str) -> PresenceActor {
        self.lock().upsert(actor_id, display_name, now_millis())
    }

    pub fn touch(&self, actor_id: &str) -> bool {
        self.lock().touch(actor_id, now_millis())
    }

    pub fn sweep_at(&self, now_ms: i64) -> Vec<String> {
        self.lock().sweep(now_ms)
    }

    pub fn reset(&self) {
        self.lock().reset();
        tracing::info!("presence registry reset");
    }

    pub fn list(&self) -> Vec<PresenceActor> {
        self.lock().list()
    }

    pub fn get(&self, actor_id: &str) -> Option<PresenceActor> {
        self.lock().get(actor_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Consumes the activity stream until the sender side closes.
    ///
    /// A lagging receiver logs the number of skipped events and keeps going;
    /// it never stalls the producer or other consumers.
    pub async fn run_consumer(self, mut events: broadcast::Receiver<ActivityEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(actor) = self.apply(&event) {
                        tracing::debug!(
                            actor_id = %actor.actor_id,
                            slot = actor.slot,
                            "presence updated"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "presence consumer lagged; events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("presence consumer stopped");
    }

    /// Runs the aging sweep indefinitely.
    ///
    /// Each tick demotes actors idle longer than the registry's away
    /// threshold. A zero interval disables the sweep.
    pub async fn run_sweeper(self, interval: Duration) {
        if interval.is_zero() {
            tracing::warn!("presence sweep disabled (interval=0)");
            return;
        }

        tracing::info!(
            interval_secs = interval.as_secs(),
            "starting presence aging sweep"
        );

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            let demoted = self.sweep_at(now_millis());
            if !demoted.is_empty() {
                tracing::info!(count = demoted.len(), "marked idle actors away");
            }
        }
    }
}
