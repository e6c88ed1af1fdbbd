//! Fan-out of activity frames to every connected viewer.

use pulse_types::CONNECTED_FRAME_TYPE;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

pub const DEFAULT_SESSION_BUFFER: usize = 256;

/// The greeting each subscriber receives before any broadcast frame.
pub fn connected_frame() -> String {
    serde_json::json!({
        "type": CONNECTED_FRAME_TYPE,
        "ts": chrono::Utc::now().timestamp_millis(),
    })
    .to_string()
}

/// Active WebSocket sessions plus the SSE broadcast channel.
///
/// Each WebSocket session owns a bounded queue; a full queue drops the
/// frame for that session only. SSE subscribers share a broadcast channel
/// of the same capacity and skip ahead when they lag.
#[derive(Clone)]
pub struct SessionHub {
    sessions: Arc<RwLock<HashMap<Uuid, mpsc::Sender<String>>>>,
    stream_tx: broadcast::Sender<String>,
    session_buffer: usize,
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_BUFFER)
    }
}

impl SessionHub {
    pub fn new(session_buffer: usize) -> Self {
        let session_buffer = session_buffer.max(1);
        let (stream_tx, _) = broadcast::channel(session_buffer);
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            stream_tx,
            session_buffer,
        }
    }

    pub fn session_buffer(&self) -> usize {
        self.session_buffer
    }

    /// Registers a WebSocket session and returns its id.
    pub async fn add_session(&self, sender: mpsc::Sender<String>) -> Uuid {
        let session_id = Uuid::new_v4();
        self.sessions.write().await.insert(session_id, sender);
        tracing::info!(%session_id, "websocket session opened");
        session_id
    }

    pub async fn remove_session(&self, session_id: Uuid) {
        if self.sessions.write().await.remove(&session_id).is_some() {
            tracing::info!(%session_id, "websocket session closed");
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn stream_subscriber_count(&self) -> usize {
        self.stream_tx.receiver_count()
    }

    pub fn subscribe_stream(&self) -> broadcast::Receiver<String> {
        self.stream_tx.subscribe()
    }

    /// Sends `frame` to every subscriber. Returns how many accepted it.
    pub async fn broadcast(&self, frame: String) -> usize {
        let mut delivered = 0;
        {
            let sessions = self.sessions.read().await;
            for (session_id, sender) in sessions.iter() {
                match sender.try_send(frame.clone()) {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        tracing::warn!(
                            %session_id,
                            "dropping broadcast frame for slow consumer: {}",
                            e
                        );
                    }
                }
            }
        }
        // Err only means there are no SSE subscribers right now.
        delivered += self.stream_tx.send(frame).unwrap_or(0);
        delivered
    }
}
