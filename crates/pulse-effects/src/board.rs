//! Per-actor effect state fed from the activity stream.

use crate::overlay::{MediaOverlay, MediaOverlayStack, MAX_OVERLAYS_PER_ACTOR};
use crate::scheduler::{AnimationScheduler, AnimationTask, EnqueueOutcome, SchedulerConfig};
use pulse_types::{now_millis, ActivityEvent, EffectType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Default)]
struct ActorEffects {
    scheduler: AnimationScheduler,
    overlays: MediaOverlayStack,
}

/// Every actor's animation queue and overlay stack.
///
/// Queues are created lazily on an actor's first effect and share one
/// scheduler configuration.
#[derive(Debug, Clone, Default)]
pub struct EffectBoard {
    config: SchedulerConfig,
    actors: Arc<Mutex<HashMap<String, ActorEffects>>>,
}

impl EffectBoard {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            actors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActorEffects>> {
        self.actors.lock().unwrap_or_else(|poisoned| {
            tracing::error!("effect board lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn entry<'a>(
        &self,
        actors: &'a mut HashMap<String, ActorEffects>,
        actor_id: &str,
    ) -> &'a mut ActorEffects {
        actors
            .entry(actor_id.to_string())
            .or_insert_with(|| ActorEffects {
                scheduler: AnimationScheduler::new(self.config),
                overlays: MediaOverlayStack::new(MAX_OVERLAYS_PER_ACTOR),
            })
    }

    /// Applies one event: queues its effect and stacks its media.
    ///
    /// Error events and actions without an effect leave the animation
    /// state untouched. Returns the enqueue outcome when an effect applied.
    pub fn apply(&self, event: &ActivityEvent) -> Option<EnqueueOutcome> {
        if event.is_error() {
            return None;
        }
        let effect = EffectType::from_action(&event.action);
        if effect.is_none() && event.media_url.is_none() {
            return None;
        }

        let mut actors = self.lock();
        let entry = self.entry(&mut actors, &event.actor_id);
        if let Some(url) = &event.media_url {
            entry.overlays.push(url, now_millis());
        }
        let outcome = effect.map(|effect| entry.scheduler.enqueue(effect));
        if let Some(outcome) = outcome {
            tracing::debug!(actor_id = %event.actor_id, ?outcome, "animation requested");
        }
        outcome
    }

    pub fn enqueue(&self, actor_id: &str, effect: EffectType) -> EnqueueOutcome {
        let mut actors = self.lock();
        self.entry(&mut actors, actor_id).scheduler.enqueue(effect)
    }

    /// Handle to one actor's scheduler, if the actor has any effect state.
    pub fn scheduler(&self, actor_id: &str) -> Option<AnimationScheduler> {
        self.lock().get(actor_id).map(|entry| entry.scheduler.clone())
    }

    pub fn current(&self, actor_id: &str) -> Option<AnimationTask> {
        self.scheduler(actor_id).and_then(|scheduler| scheduler.current())
    }

    /// Currently playing animations, ordered by actor id.
    pub fn current_animations(&self) -> Vec<(String, AnimationTask)> {
        let mut playing: Vec<_> = self
            .lock()
            .iter()
            .filter_map(|(actor_id, entry)| {
                entry
                    .scheduler
                    .current()
                    .map(|task| (actor_id.clone(), task))
            })
            .collect();
        playing.sort_by(|a, b| a.0.cmp(&b.0));
        playing
    }

    pub fn overlays(&self, actor_id: &str) -> Vec<MediaOverlay> {
        self.lock()
            .get(actor_id)
            .map(|entry| entry.overlays.list().to_vec())
            .unwrap_or_default()
    }

    pub fn dismiss_overlay(&self, actor_id: &str, overlay_id: Uuid) -> bool {
        self.lock()
            .get_mut(actor_id)
            .is_some_and(|entry| entry.overlays.dismiss(overlay_id))
    }

    /// Clears every queue and overlay and forgets all actors.
    pub fn reset(&self) {
        let mut actors = self.lock();
        for entry in actors.values_mut() {
            entry.scheduler.clear();
            entry.overlays.clear();
        }
        actors.clear();
        tracing::info!("effect board reset");
    }

    /// Consumes the activity stream until the sender side closes.
    pub async fn run_consumer(self, mut events: broadcast::Receiver<ActivityEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    self.apply(&event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "effect consumer lagged; events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("effect consumer stopped");
    }
}
