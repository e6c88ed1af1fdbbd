//! One viewer session: the connection plus every derived-state consumer.

use crate::config::Config;
use crate::connection::{ConnectionConfig, ConnectionManager};
use crate::event_log::EventLog;
use crate::transport::Connector;
use pulse_chaos::{ChaosConfig, ChaosLabel, ChaosMeter};
use pulse_effects::{AnimationTask, EffectBoard, SchedulerConfig};
use pulse_presence::{PresenceActor, PresenceService, RegistryConfig};
use pulse_types::{ActivityEvent, ConnectionStatus};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Sizing and timing for every component of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub connection: ConnectionConfig,
    pub registry: RegistryConfig,
    pub sweep_interval: Duration,
    pub scheduler: SchedulerConfig,
    pub chaos: ChaosConfig,
    pub event_log_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            registry: RegistryConfig::default(),
            sweep_interval: pulse_presence::DEFAULT_SWEEP_INTERVAL,
            scheduler: SchedulerConfig::default(),
            chaos: ChaosConfig::default(),
            event_log_capacity: crate::event_log::DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            connection: config.connection(),
            registry: config.registry(),
            sweep_interval: config.sweep_interval(),
            scheduler: config.scheduler(),
            chaos: config.chaos(),
            event_log_capacity: config.event_log.capacity,
        }
    }
}

/// A one-shot view of a session's derived state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub actors: Vec<PresenceActor>,
    pub animations: Vec<ActorAnimation>,
    pub chaos_score: f64,
    pub chaos_label: ChaosLabel,
    pub recent_events: Vec<ActivityEvent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorAnimation {
    pub actor_id: String,
    pub task: AnimationTask,
}

/// Connection manager wired to presence, effects, chaos and the event log.
///
/// Each consumer holds its own broadcast receiver, subscribed before the
/// connection starts, so a slow consumer only ever lags itself.
#[derive(Debug)]
pub struct OfficeSession {
    connection: ConnectionManager,
    presence: PresenceService,
    effects: EffectBoard,
    chaos: ChaosMeter,
    event_log: EventLog,
    tasks: Vec<JoinHandle<()>>,
}

impl OfficeSession {
    /// Builds the session and starts its background tasks.
    ///
    /// Must be called inside a Tokio runtime. The connection is not opened
    /// until [`OfficeSession::connect`].
    pub fn start(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        let connection = ConnectionManager::new(config.connection, connector);
        let presence = PresenceService::new(config.registry);
        let effects = EffectBoard::new(config.scheduler);
        let chaos = ChaosMeter::new(config.chaos);
        let event_log = EventLog::new(config.event_log_capacity);

        let tasks = vec![
            tokio::spawn(presence.clone().run_consumer(connection.subscribe())),
            tokio::spawn(presence.clone().run_sweeper(config.sweep_interval)),
            tokio::spawn(effects.clone().run_consumer(connection.subscribe())),
            tokio::spawn(chaos.clone().run_consumer(connection.subscribe())),
            tokio::spawn(chaos.clone().run_decay()),
            tokio::spawn(event_log.clone().run_consumer(connection.subscribe())),
        ];

        Self {
            connection,
            presence,
            effects,
            chaos,
            event_log,
            tasks,
        }
    }

    pub fn connect(&self) {
        self.connection.connect();
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    /// Resets presence, animations, chaos and the event log together.
    ///
    /// The connection is left as it is.
    pub fn reset(&self) {
        self.presence.reset();
        self.effects.reset();
        self.chaos.reset();
        self.event_log.clear();
        tracing::info!("office session reset");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let reading = self.chaos.reading();
        SessionSnapshot {
            status: self.connection.status(),
            actors: self.presence.list(),
            animations: self
                .effects
                .current_animations()
                .into_iter()
                .map(|(actor_id, task)| ActorAnimation { actor_id, task })
                .collect(),
            chaos_score: reading.score,
            chaos_label: reading.label,
            recent_events: self.event_log.recent(),
        }
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn presence(&self) -> &PresenceService {
        &self.presence
    }

    pub fn effects(&self) -> &EffectBoard {
        &self.effects
    }

    pub fn chaos(&self) -> &ChaosMeter {
        &self.chaos
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Disconnects and stops every background task.
    pub async fn shutdown(mut self) {
        self.connection.disconnect().await;
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.effects.reset();
    }
}

impl Drop for OfficeSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
