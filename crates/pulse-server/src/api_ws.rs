//! WebSocket viewer endpoint.

use crate::hub::connected_frame;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handler for `GET /ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Bounded so a stalled viewer drops frames instead of growing memory.
    let (tx, mut rx) = mpsc::channel::<String>(state.hub.session_buffer());

    // Queue the greeting before registering so it always arrives first.
    if tx.try_send(connected_frame()).is_err() {
        return;
    }
    let session_id = state.hub.add_session(tx).await;

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // Viewers are receive-only; drain inbound frames until the socket closes.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(Message::Text(text)) => {
                    tracing::debug!(len = text.as_str().len(), "ignoring inbound viewer frame");
                }
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.remove_session(session_id).await;
}
