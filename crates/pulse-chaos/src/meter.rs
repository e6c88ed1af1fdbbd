//! Shared chaos score handle with its stream consumer and decay loop.

use crate::aggregator::{ChaosAggregator, ChaosLabel, DEFAULT_BASELINE, DEFAULT_DECAY_AMOUNT};
use pulse_types::ActivityEvent;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

pub const DEFAULT_DECAY_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaosConfig {
    pub baseline: f64,
    pub decay_amount: f64,
    pub decay_interval: Duration,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            baseline: DEFAULT_BASELINE,
            decay_amount: DEFAULT_DECAY_AMOUNT,
            decay_interval: DEFAULT_DECAY_INTERVAL,
        }
    }
}

/// A published score and its band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChaosReading {
    pub score: f64,
    pub label: ChaosLabel,
}

impl ChaosReading {
    fn of(aggregator: &ChaosAggregator) -> Self {
        Self {
            score: aggregator.score(),
            label: aggregator.label(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    config: ChaosConfig,
    aggregator: Mutex<ChaosAggregator>,
    tx: watch::Sender<ChaosReading>,
}

/// Cloneable handle to one session's chaos score.
///
/// Every mutation publishes the new reading on a watch channel while the
/// aggregator lock is still held, so observers never see readings out of
/// order.
#[derive(Debug, Clone)]
pub struct ChaosMeter {
    shared: Arc<Shared>,
}

impl Default for ChaosMeter {
    fn default() -> Self {
        Self::new(ChaosConfig::default())
    }
}

impl ChaosMeter {
    pub fn new(config: ChaosConfig) -> Self {
        let aggregator = ChaosAggregator::new(config.baseline);
        let (tx, _) = watch::channel(ChaosReading::of(&aggregator));
        Self {
            shared: Arc::new(Shared {
                config,
                aggregator: Mutex::new(aggregator),
                tx,
            }),
        }
    }

    pub fn config(&self) -> ChaosConfig {
        self.shared.config
    }

    fn lock(&self) -> MutexGuard<'_, ChaosAggregator> {
        self.shared.aggregator.lock().unwrap_or_else(|poisoned| {
            tracing::error!("chaos score lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn update(&self, mutate: impl FnOnce(&mut ChaosAggregator)) -> ChaosReading {
        let mut aggregator = self.lock();
        mutate(&mut aggregator);
        let reading = ChaosReading::of(&aggregator);
        self.shared.tx.send_if_modified(|published| {
            let changed = *published != reading;
            *published = reading;
            changed
        });
        reading
    }

    /// Applies one event. Error events leave the score untouched.
    pub fn apply(&self, event: &ActivityEvent) -> Option<ChaosReading> {
        if event.is_error() {
            return None;
        }
        Some(self.apply_action(&event.action))
    }

    pub fn apply_action(&self, action: &str) -> ChaosReading {
        self.update(|aggregator| {
            aggregator.apply(action);
        })
    }

    pub fn decay(&self) -> ChaosReading {
        let amount = self.shared.config.decay_amount;
        self.update(|aggregator| {
            aggregator.decay(amount);
        })
    }

    pub fn reset(&self) {
        self.update(ChaosAggregator::reset);
        tracing::info!("chaos score reset");
    }

    pub fn reading(&self) -> ChaosReading {
        *self.shared.tx.borrow()
    }

    pub fn score(&self) -> f64 {
        self.reading().score
    }

    pub fn label(&self) -> ChaosLabel {
        self.reading().label
    }

    pub fn subscribe(&self) -> watch::Receiver<ChaosReading> {
        self.shared.tx.subscribe()
    }

    /// Consumes the activity stream until the sender side closes.
    pub async fn run_consumer(self, mut events: broadcast::Receiver<ActivityEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(reading) = self.apply(&event) {
                        tracing::debug!(score = reading.score, label = %reading.label, "chaos updated");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "chaos consumer lagged; events were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("chaos consumer stopped");
    }

    /// Runs the decay tick indefinitely. A zero interval disables decay.
    pub async fn run_decay(self) {
        let interval = self.shared.config.decay_interval;
        if interval.is_zero() {
            tracing::warn!("chaos decay disabled (interval=0)");
            return;
        }

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            self.decay();
        }
    }
}
