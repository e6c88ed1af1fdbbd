use futures_util::StreamExt;
use pulse_client::{ConnectionConfig, NetworkConnector, OfficeSession, SessionConfig, SseDecoder};
use pulse_server::config::HubConfig;
use pulse_server::{app, AppState};
use pulse_types::{ConnectionStatus, TransportMode};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

async fn start_hub() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app(AppState::new(&HubConfig::default()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn rage_payload() -> Value {
    json!({
        "userId": "u1",
        "displayName": "Alex Chen",
        "action": "rage",
        "messageText": "x",
        "timestamp": 1000
    })
}

async fn post_activity(addr: SocketAddr, payload: &Value) -> Value {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/activity"))
        .json(payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
    response.json().await.unwrap()
}

async fn health(addr: SocketAddr) -> Value {
    reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

/// Polls until `done` holds, failing after five seconds.
async fn eventually<F, Fut>(mut done: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if done().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn websocket_viewer_gets_greeting_then_broadcasts() {
    let addr = start_hub().await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

    let Some(Ok(Message::Text(greeting))) = ws.next().await else {
        panic!("expected connected frame");
    };
    let greeting: Value = serde_json::from_str(greeting.as_str()).unwrap();
    assert_eq!(greeting["type"], "connected");
    assert!(greeting["ts"].is_i64());

    let accepted = post_activity(addr, &rage_payload()).await;
    assert_eq!(accepted["delivered"], 1);

    let Some(Ok(Message::Text(frame))) = ws.next().await else {
        panic!("expected activity frame");
    };
    let frame: Value = serde_json::from_str(frame.as_str()).unwrap();
    assert_eq!(frame, rage_payload());
}

#[tokio::test]
async fn closed_websocket_is_removed_from_the_hub() {
    let addr = start_hub().await;
    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws.next().await.unwrap().unwrap();
    assert_eq!(health(addr).await["sessions"], 1);

    ws.close(None).await.unwrap();
    eventually(|| async move { health(addr).await["sessions"] == 0 }).await;
}

#[tokio::test]
async fn sse_viewer_gets_greeting_then_broadcasts() {
    let addr = start_hub().await;
    let mut response = reqwest::Client::new()
        .get(format!("http://{addr}/events/stream"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let mut decoder = SseDecoder::default();
    let mut events = Vec::new();
    while events.is_empty() {
        let chunk = response.chunk().await.unwrap().expect("stream closed");
        events.extend(decoder.feed(&chunk));
    }
    let greeting: Value = serde_json::from_str(&events.remove(0)).unwrap();
    assert_eq!(greeting["type"], "connected");

    post_activity(addr, &rage_payload()).await;
    while events.is_empty() {
        let chunk = response.chunk().await.unwrap().expect("stream closed");
        events.extend(decoder.feed(&chunk));
    }
    let frame: Value = serde_json::from_str(&events[0]).unwrap();
    assert_eq!(frame, rage_payload());
}

async fn session_over(addr: SocketAddr, mode: TransportMode) -> OfficeSession {
    let url = match mode {
        TransportMode::WebSocket => format!("ws://{addr}/ws"),
        TransportMode::Sse => format!("http://{addr}/events/stream"),
    };
    let session = OfficeSession::start(
        SessionConfig {
            connection: ConnectionConfig {
                url: Some(url),
                mode,
                ..ConnectionConfig::default()
            },
            ..SessionConfig::default()
        },
        Arc::new(NetworkConnector::new()),
    );
    let mut status = session.connection().watch_status();
    session.connect();
    tokio::time::timeout(
        Duration::from_secs(5),
        status.wait_for(|s| *s == ConnectionStatus::Live),
    )
    .await
    .expect("session never went live")
    .unwrap();
    session
}

#[tokio::test]
async fn websocket_session_end_to_end() {
    let addr = start_hub().await;
    let session = session_over(addr, TransportMode::WebSocket).await;
    let viewer = &session;
    eventually(|| async move { health(addr).await["sessions"] == 1 }).await;

    post_activity(addr, &rage_payload()).await;
    eventually(|| async move { viewer.chaos().score() == 35.0 }).await;
    eventually(|| async move { viewer.presence().get("u1").is_some() }).await;

    assert_eq!(session.presence().get("u1").unwrap().initials, "AC");
    assert_eq!(session.event_log().len(), 1);
    session.shutdown().await;
}

#[tokio::test]
async fn sse_session_end_to_end() {
    let addr = start_hub().await;
    let session = session_over(addr, TransportMode::Sse).await;
    let viewer = &session;
    eventually(|| async move { health(addr).await["streams"] == 1 }).await;

    post_activity(addr, &json!({ "displayName": "nobody" })).await;
    eventually(|| async move { viewer.event_log().len() == 1 }).await;

    let logged = &session.event_log().recent()[0];
    assert!(logged.is_error());
    assert!(session.presence().is_empty());
    session.shutdown().await;
}
