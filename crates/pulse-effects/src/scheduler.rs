//! Single-queue animation scheduler.
//!
//! One scheduler drives one avatar. At most one task plays at a time; the
//! rest wait in a FIFO queue behind a cooldown. Every transition out of
//! "playing" goes through [`AnimationScheduler::complete_current`] or the
//! play timer, and both paths share one guarded completion so a timer that
//! fires after a manual completion does nothing.

use pulse_types::EffectType;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Default pause between one animation finishing and the next starting.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1000);

/// Default window in which a repeat of a queued effect is dropped.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub cooldown: Duration,
    pub dedup_window: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            dedup_window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

/// One queued or playing animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationTask {
    pub id: Uuid,
    pub effect: EffectType,
    pub duration_ms: u64,
    #[serde(skip)]
    pub enqueued_at: Instant,
}

impl AnimationTask {
    fn new(effect: EffectType, enqueued_at: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            effect,
            duration_ms: u64::try_from(effect.duration().as_millis()).unwrap_or(u64::MAX),
            enqueued_at,
        }
    }
}

/// What [`AnimationScheduler::enqueue`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Nothing was playing; the task is current.
    Started,
    /// Appended to the queue.
    Queued,
    /// Same effect already queued inside the dedup window.
    Dropped,
}

#[derive(Debug, Default)]
struct QueueState {
    current: Option<AnimationTask>,
    queue: VecDeque<AnimationTask>,
    cooling_down: bool,
    /// Bumped whenever a cooldown is armed or cancelled.
    epoch: u64,
    play_timer: Option<JoinHandle<()>>,
    cooldown_timer: Option<JoinHandle<()>>,
}

impl QueueState {
    fn abort_timers(&mut self) {
        if let Some(handle) = self.play_timer.take() {
            handle.abort();
        }
        if let Some(handle) = self.cooldown_timer.take() {
            handle.abort();
        }
    }
}

#[derive(Debug)]
struct Shared {
    config: SchedulerConfig,
    state: Mutex<QueueState>,
    current_tx: watch::Sender<Option<AnimationTask>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|p| p.into_inner());
        state.abort_timers();
    }
}

/// Cloneable handle to one animation queue.
///
/// Timers are tokio tasks, so `enqueue` and `complete_current` must run
/// inside a Tokio runtime. Timer tasks hold only a weak reference; dropping
/// the last handle cancels everything outstanding.
#[derive(Debug, Clone)]
pub struct AnimationScheduler {
    shared: Arc<Shared>,
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl AnimationScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (current_tx, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(QueueState::default()),
                current_tx,
            }),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.shared.state.lock().unwrap_or_else(|poisoned| {
            tracing::error!("animation queue lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Requests an effect.
    ///
    /// Starts it immediately when idle, otherwise queues it behind the
    /// current task and cooldown. A repeat of an effect that is already
    /// waiting in the queue and younger than the dedup window is dropped.
    pub fn enqueue(&self, effect: EffectType) -> EnqueueOutcome {
        let now = Instant::now();
        let task = AnimationTask::new(effect, now);
        let mut state = self.lock();

        if state.current.is_none() && !state.cooling_down {
            self.start_locked(&mut state, task);
            return EnqueueOutcome::Started;
        }

        let window = self.shared.config.dedup_window;
        let duplicate = state
            .queue
            .iter()
            .any(|queued| queued.effect == effect && now.duration_since(queued.enqueued_at) < window);
        if duplicate {
            tracing::debug!(effect = %effect, "dropping duplicate animation");
            return EnqueueOutcome::Dropped;
        }

        state.queue.push_back(task);
        EnqueueOutcome::Queued
    }

    /// Completes the current task ahead of its timer.
    ///
    /// Returns `false` when nothing is playing.
    pub fn complete_current(&self) -> bool {
        self.finish(None)
    }

    /// Cancels every timer, empties the queue and clears the cooldown.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.abort_timers();
        state.queue.clear();
        state.current = None;
        state.cooling_down = false;
        state.epoch = state.epoch.wrapping_add(1);
        self.shared.current_tx.send_replace(None);
    }

    /// The task currently playing, if any.
    pub fn current(&self) -> Option<AnimationTask> {
        self.shared.current_tx.borrow().clone()
    }

    /// Observes changes to the current task.
    pub fn subscribe(&self) -> watch::Receiver<Option<AnimationTask>> {
        self.shared.current_tx.subscribe()
    }

    pub fn queue_len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_cooling_down(&self) -> bool {
        self.lock().cooling_down
    }

    /// Idle means nothing playing, nothing queued and no cooldown.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.current.is_none() && state.queue.is_empty() && !state.cooling_down
    }

    fn start_locked(&self, state: &mut QueueState, task: AnimationTask) {
        let weak = Arc::downgrade(&self.shared);
        let task_id = task.id;
        let deadline = Instant::now() + Duration::from_millis(task.duration_ms);

        tracing::debug!(effect = %task.effect, duration_ms = task.duration_ms, "animation started");
        state.current = Some(task.clone());
        state.play_timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(scheduler) = upgrade(&weak) {
                scheduler.finish(Some(task_id));
            }
        }));
        self.shared.current_tx.send_replace(Some(task));
    }

    /// The single completion transition.
    ///
    /// `expected` is set by the play timer; a mismatch means the task it was
    /// armed for already finished, so the call is a no-op.
    fn finish(&self, expected: Option<Uuid>) -> bool {
        let mut state = self.lock();
        let Some(current) = state.current.as_ref() else {
            return false;
        };
        if expected.is_some_and(|id| id != current.id) {
            return false;
        }

        state.current = None;
        if let Some(handle) = state.play_timer.take() {
            // The timer path is running inside this handle's task.
            if expected.is_none() {
                handle.abort();
            }
        }

        state.cooling_down = true;
        state.epoch = state.epoch.wrapping_add(1);
        let epoch = state.epoch;
        let weak = Arc::downgrade(&self.shared);
        let deadline = Instant::now() + self.shared.config.cooldown;
        state.cooldown_timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(scheduler) = upgrade(&weak) {
                scheduler.end_cooldown(epoch);
            }
        }));

        self.shared.current_tx.send_replace(None);
        true
    }

    fn end_cooldown(&self, epoch: u64) {
        let mut state = self.lock();
        if state.epoch != epoch || !state.cooling_down {
            return;
        }
        state.cooling_down = false;
        state.cooldown_timer = None;
        if let Some(next) = state.queue.pop_front() {
            self.start_locked(&mut state, next);
        }
    }
}

fn upgrade(weak: &Weak<Shared>) -> Option<AnimationScheduler> {
    weak.upgrade().map(|shared| AnimationScheduler { shared })
}
