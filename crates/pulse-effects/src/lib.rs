//! Transient avatar effects: debounced animation queues and media overlays.
//!
//! Each actor gets its own [`AnimationScheduler`]. A scheduler plays one
//! effect at a time, waits out a cooldown after each, and drops repeats of
//! an effect that is already waiting. [`EffectBoard`] maps actors to their
//! schedulers and overlay stacks and consumes the activity stream.

mod board;
pub mod overlay;
mod scheduler;

pub use board::EffectBoard;
pub use overlay::{MediaOverlay, MediaOverlayStack, MAX_OVERLAYS_PER_ACTOR};
pub use scheduler::{
    AnimationScheduler, AnimationTask, EnqueueOutcome, SchedulerConfig, DEFAULT_COOLDOWN,
    DEFAULT_DEDUP_WINDOW,
};
