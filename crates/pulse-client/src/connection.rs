//! Connection lifecycle: one transport, a status state machine, and the
//! validated event stream.
//!
//! ```text
//! offline --connect()--> connecting --open--> live
//! live | connecting --close/error--> reconnecting   (retries remain)
//!                                 \-> offline        (retries exhausted)
//! reconnecting --backoff elapsed--> connecting
//! any --disconnect()--> offline
//! ```
//!
//! A single supervisor task owns the transport and every retry timer, so
//! `disconnect()` cancels all outstanding work by aborting that task.

use crate::transport::{Connector, Transport, TransportError};
use pulse_events::{decode_frame, ingest, Frame};
use pulse_types::{now_millis, ActivityEvent, ConnectionStatus, TransportMode};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_millis(30_000);
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Delay before retry `attempt` (0-indexed): `min(base * 2^attempt, cap)`.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(cap, |delay| delay.min(cap))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Relay endpoint. `None` keeps the manager offline.
    pub url: Option<String>,
    pub mode: TransportMode,
    pub max_reconnect_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    /// Capacity of the event broadcast channel per receiver.
    pub event_buffer: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            mode: TransportMode::default(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_cap: DEFAULT_BACKOFF_CAP,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

struct Inner {
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    status_tx: watch::Sender<ConnectionStatus>,
    events_tx: broadcast::Sender<ActivityEvent>,
    attempts: AtomicU32,
}

impl Inner {
    fn set_status(&self, status: ConnectionStatus) {
        let changed = self.status_tx.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
        if changed {
            tracing::info!(status = %status, "connection status changed");
        }
    }

    fn handle_frame(&self, text: &str) {
        match decode_frame(text) {
            Frame::Control { frame_type, ts } => {
                tracing::debug!(frame_type = %frame_type, ?ts, "control frame");
            }
            Frame::Activity(payload) => {
                let event = ingest(&payload, now_millis());
                tracing::debug!(actor_id = %event.actor_id, action = %event.action, "activity frame");
                if self.events_tx.send(event).is_err() {
                    tracing::trace!("no event subscribers");
                }
            }
        }
    }
}

/// Owns the connection to one relay hub.
///
/// Dropping the manager aborts its supervisor task.
pub struct ConnectionManager {
    inner: Arc<Inner>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.inner.config)
            .field("status", &self.status())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(config: ConnectionConfig, connector: Arc<dyn Connector>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Offline);
        let (events_tx, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                status_tx,
                events_tx,
                attempts: AtomicU32::new(0),
            }),
            supervisor: Mutex::new(None),
        }
    }

    fn lock_supervisor(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.supervisor.lock().unwrap_or_else(|poisoned| {
            tracing::error!("supervisor lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Starts the supervisor. No-op while one is already running, and with
    /// no URL configured the manager stays offline.
    pub fn connect(&self) {
        let Some(url) = self.inner.config.url.clone() else {
            tracing::info!("no transport url configured; staying offline");
            return;
        };

        let mut supervisor = self.lock_supervisor();
        if supervisor.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("connect ignored; supervisor already running");
            return;
        }

        self.inner.attempts.store(0, Ordering::Relaxed);
        self.inner.set_status(ConnectionStatus::Connecting);
        *supervisor = Some(tokio::spawn(supervise(Arc::clone(&self.inner), url)));
    }

    /// Forces `offline`, closing the transport and cancelling any pending
    /// retry.
    pub async fn disconnect(&self) {
        let handle = self.lock_supervisor().take();
        if let Some(handle) = handle {
            handle.abort();
            // Wait for the abort so the transport is dropped before we return.
            let _ = handle.await;
        }
        self.inner.attempts.store(0, Ordering::Relaxed);
        self.inner.set_status(ConnectionStatus::Offline);
    }

    /// A new receiver of validated events.
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status_tx.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Retries consumed since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::Relaxed)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let supervisor = self
            .supervisor
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = supervisor.take() {
            handle.abort();
        }
    }
}

async fn supervise(inner: Arc<Inner>, url: String) {
    let config = &inner.config;
    let mut attempt: u32 = 0;

    loop {
        inner.set_status(ConnectionStatus::Connecting);
        match inner.connector.connect(&url, config.mode).await {
            Ok(mut transport) => {
                inner.set_status(ConnectionStatus::Live);
                attempt = 0;
                inner.attempts.store(0, Ordering::Relaxed);

                match pump(&inner, transport.as_mut()).await {
                    Ok(()) => tracing::info!("transport closed by server"),
                    Err(e) => tracing::warn!(error = %e, "transport failed"),
                }
                if let Err(e) = transport.close().await {
                    tracing::debug!(error = %e, "transport close failed");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "transport failed to open");
            }
        }

        if attempt >= config.max_reconnect_attempts {
            tracing::warn!(attempt, "reconnect attempts exhausted; staying offline");
            inner.set_status(ConnectionStatus::Offline);
            return;
        }

        let delay = backoff_delay(attempt, config.backoff_base, config.backoff_cap);
        attempt += 1;
        inner.attempts.store(attempt, Ordering::Relaxed);
        inner.set_status(ConnectionStatus::Reconnecting);
        tracing::info!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );
        tokio::time::sleep(delay).await;
    }
}

async fn pump(inner: &Inner, transport: &mut dyn Transport) -> Result<(), TransportError> {
    while let Some(frame) = transport.recv().await {
        inner.handle_frame(&frame?);
    }
    Ok(())
}
