//! Room-wide "chaos" score derived from the activity stream.
//!
//! Starts at a baseline of 20, moves by a fixed delta per event action,
//! is clamped to `[0, 100]`, and loses 0.5 every decay tick.

mod aggregator;
mod meter;

pub use aggregator::{
    action_delta, ChaosAggregator, ChaosLabel, DEFAULT_BASELINE, DEFAULT_DECAY_AMOUNT, MAX_SCORE,
    MIN_SCORE,
};
pub use meter::{ChaosConfig, ChaosMeter, ChaosReading, DEFAULT_DECAY_INTERVAL};
