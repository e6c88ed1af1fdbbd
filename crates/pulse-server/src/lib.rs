//! Relay hub: accepts upstream activity and fans it out to viewers over
//! WebSocket and SSE.

pub mod api_activity;
pub mod api_sse;
pub mod api_ws;
pub mod config;
pub mod hub;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    routing::{get, post},
    Json, Router,
};
use hub::SessionHub;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Viewer sessions and the SSE broadcast channel.
    pub hub: SessionHub,
    /// Largest accepted ingestion body.
    pub max_payload_bytes: usize,
}

impl AppState {
    pub fn new(config: &config::HubConfig) -> Self {
        Self {
            hub: SessionHub::new(config.session_buffer),
            max_payload_bytes: config.max_payload_bytes,
        }
    }
}

/// Health check handler.
async fn health(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.hub.session_count().await,
        "streams": state.hub.stream_subscriber_count(),
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let max_payload_bytes = state.max_payload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(api_ws::ws_handler))
        .route("/events/stream", get(api_sse::get_event_stream_handler))
        .route("/api/activity", post(api_activity::post_activity_handler))
        .layer(DefaultBodyLimit::max(max_payload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
