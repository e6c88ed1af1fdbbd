mod common;

use common::{frame, wait_until, ScriptedConnector, Step};
use pulse_client::{ConnectionConfig, ConnectionManager};
use pulse_types::{ConnectionStatus, EventKind};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn config() -> ConnectionConfig {
    ConnectionConfig {
        url: Some("ws://hub.test/ws".to_string()),
        ..ConnectionConfig::default()
    }
}

async fn wait_for_status(rx: &mut watch::Receiver<ConnectionStatus>, wanted: ConnectionStatus) {
    rx.wait_for(|status| *status == wanted)
        .await
        .expect("status channel closed");
}

#[tokio::test(start_paused = true)]
async fn backoff_sequence_then_offline() {
    let connector = Arc::new(ScriptedConnector::always_failing());
    let manager = ConnectionManager::new(config(), connector.clone());
    let mut status = manager.watch_status();

    manager.connect();
    assert_eq!(manager.status(), ConnectionStatus::Connecting);
    wait_for_status(&mut status, ConnectionStatus::Reconnecting).await;
    wait_for_status(&mut status, ConnectionStatus::Offline).await;

    // Initial attempt plus five retries; the sixth failure settles offline.
    assert_eq!(connector.attempt_count(), 6);
    assert_eq!(connector.gaps_ms(), [1000, 2000, 4000, 8000, 16000]);
    assert_eq!(manager.reconnect_attempts(), 5);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempt_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn reaching_live_resets_the_retry_counter() {
    let connector = Arc::new(ScriptedConnector::new(vec![
        Step::Fail,
        Step::Fail,
        Step::Open(vec![None]),
    ]));
    let manager = ConnectionManager::new(config(), connector.clone());
    let mut status = manager.watch_status();

    manager.connect();
    // The open transport closes at once, so `live` is too brief to observe.
    wait_for_status(&mut status, ConnectionStatus::Offline).await;

    assert_eq!(connector.attempt_count(), 8);
    assert_eq!(
        connector.gaps_ms(),
        [1000, 2000, 1000, 2000, 4000, 8000, 16000]
    );
}

#[tokio::test(start_paused = true)]
async fn frames_become_validated_events() {
    let connector = Arc::new(ScriptedConnector::new(vec![Step::Open(vec![
        frame(json!({ "type": "connected", "ts": 1_700_000_000_000_i64 })),
        frame(json!({
            "userId": " u1 ",
            "displayName": "Alex Chen",
            "action": "rage",
            "messageText": "  x  ",
            "timestamp": 1000
        })),
        Some(Ok("not json".to_string())),
        frame(json!({
            "type": "activity",
            "data": {
                "userId": "u2",
                "displayName": "Sam Lee",
                "action": "party",
                "messageText": "we shipped"
            }
        })),
    ])]));
    let manager = ConnectionManager::new(config(), connector.clone());
    let mut events = manager.subscribe();

    manager.connect();

    let first = events.recv().await.unwrap();
    assert_eq!(first.kind, EventKind::Event);
    assert_eq!(first.actor_id, "u1");
    assert_eq!(first.message_text, "x");
    assert_eq!(first.timestamp, 1000);

    let second = events.recv().await.unwrap();
    assert_eq!(second.kind, EventKind::Error);
    assert!(second.message_text.contains("not json"));

    let third = events.recv().await.unwrap();
    assert_eq!(third.actor_id, "u2");
    assert_eq!(third.action, "party");

    assert_eq!(manager.status(), ConnectionStatus::Live);
    assert_eq!(connector.attempt_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_cancels_pending_retry() {
    let connector = Arc::new(ScriptedConnector::always_failing());
    let manager = ConnectionManager::new(config(), connector.clone());
    let mut status = manager.watch_status();

    manager.connect();
    wait_for_status(&mut status, ConnectionStatus::Reconnecting).await;
    manager.disconnect().await;
    assert_eq!(manager.status(), ConnectionStatus::Offline);
    assert_eq!(manager.reconnect_attempts(), 0);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(connector.attempt_count(), 1);
    assert_eq!(manager.status(), ConnectionStatus::Offline);
}

#[tokio::test(start_paused = true)]
async fn disconnect_from_live_closes_the_stream() {
    let connector = Arc::new(ScriptedConnector::new(vec![Step::Open(vec![])]));
    let manager = ConnectionManager::new(config(), connector.clone());
    let mut status = manager.watch_status();

    manager.connect();
    wait_for_status(&mut status, ConnectionStatus::Live).await;
    manager.disconnect().await;
    assert_eq!(manager.status(), ConnectionStatus::Offline);

    // A manual connect after disconnect starts over.
    manager.connect();
    wait_for_status(&mut status, ConnectionStatus::Reconnecting).await;
    assert_eq!(connector.attempt_count(), 2);
}

#[tokio::test]
async fn absent_url_stays_offline() {
    let connector = Arc::new(ScriptedConnector::always_failing());
    let manager = ConnectionManager::new(ConnectionConfig::default(), connector.clone());

    manager.connect();
    tokio::task::yield_now().await;
    assert_eq!(manager.status(), ConnectionStatus::Offline);
    assert_eq!(connector.attempt_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn second_connect_is_ignored_while_running() {
    let connector = Arc::new(ScriptedConnector::new(vec![Step::Open(vec![])]));
    let manager = ConnectionManager::new(config(), connector.clone());

    manager.connect();
    manager.connect();
    wait_until(|| manager.status() == ConnectionStatus::Live).await;
    manager.connect();
    tokio::task::yield_now().await;
    assert_eq!(connector.attempt_count(), 1);
}
