//! SSE viewer endpoint.

use crate::hub::connected_frame;
use crate::AppState;
use axum::{
    extract::Extension,
    response::{sse::Event, Sse},
};
use futures_util::Stream;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Handler for `GET /events/stream`.
///
/// Sends the `connected` greeting, then every broadcast frame as one SSE
/// `data` event.
pub async fn get_event_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.hub.subscribe_stream();
    tracing::info!("event stream subscriber connected");

    let frames = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(frame) => Some(Ok(Event::default().data(frame))),
        Err(broadcast_error) => {
            tracing::warn!(
                error = %broadcast_error,
                "event stream lagged; frames were dropped for this subscriber"
            );
            None
        }
    });
    let greeting = tokio_stream::once(Ok(Event::default().data(connected_frame())));

    Sse::new(greeting.chain(frames)).keep_alive(axum::response::sse::KeepAlive::default())
}
