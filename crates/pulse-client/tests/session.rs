mod common;

use common::{frame, wait_until, ScriptedConnector, Step};
use pulse_chaos::ChaosLabel;
use pulse_client::{ConnectionConfig, OfficeSession, SessionConfig};
use pulse_types::{ConnectionStatus, EffectType, EventKind};
use serde_json::json;
use std::sync::Arc;

fn session(frames: Vec<common::Incoming>) -> OfficeSession {
    let config = SessionConfig {
        connection: ConnectionConfig {
            url: Some("ws://hub.test/ws".to_string()),
            ..ConnectionConfig::default()
        },
        ..SessionConfig::default()
    };
    OfficeSession::start(
        config,
        Arc::new(ScriptedConnector::new(vec![Step::Open(frames)])),
    )
}

fn rage_frame() -> common::Incoming {
    frame(json!({
        "userId": "u1",
        "displayName": "Alex Chen",
        "action": "rage",
        "messageText": "x",
        "timestamp": 1000
    }))
}

#[tokio::test(start_paused = true)]
async fn rage_event_updates_every_consumer() {
    let session = session(vec![rage_frame()]);
    session.connect();
    wait_until(|| session.event_log().len() == 1 && session.chaos().score() == 35.0).await;
    wait_until(|| session.effects().current("u1").is_some()).await;
    wait_until(|| session.presence().get("u1").is_some()).await;

    let actor = session.presence().get("u1").unwrap();
    assert_eq!(actor.initials, "AC");
    assert_eq!(session.chaos().label(), ChaosLabel::Busy);
    assert_eq!(
        session.effects().current("u1").unwrap().effect,
        EffectType::Rage
    );

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Live);
    assert_eq!(snapshot.actors.len(), 1);
    assert_eq!(snapshot.animations[0].actor_id, "u1");
    assert_eq!(snapshot.recent_events[0].timestamp, 1000);
}

#[tokio::test(start_paused = true)]
async fn empty_payload_only_reaches_the_event_log() {
    let session = session(vec![frame(json!({}))]);
    session.connect();
    wait_until(|| session.event_log().len() == 1).await;
    // Let the other consumers drain the same event.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    let logged = &session.event_log().recent()[0];
    assert_eq!(logged.kind, EventKind::Error);
    let detail = logged.error_detail.as_deref().unwrap();
    for field in ["userId", "displayName", "action", "messageText"] {
        assert!(detail.contains(field), "{field} missing from {detail}");
    }

    assert!(session.presence().is_empty());
    assert!(session.effects().current_animations().is_empty());
    assert_eq!(session.chaos().score(), 20.0);
}

#[tokio::test(start_paused = true)]
async fn reset_clears_derived_state_but_keeps_connection() {
    let session = session(vec![rage_frame()]);
    session.connect();
    wait_until(|| session.effects().current("u1").is_some()).await;
    wait_until(|| session.chaos().score() == 35.0 && !session.presence().is_empty()).await;

    session.reset();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, ConnectionStatus::Live);
    assert!(snapshot.actors.is_empty());
    assert!(snapshot.animations.is_empty());
    assert!(snapshot.recent_events.is_empty());
    assert_eq!(snapshot.chaos_score, 20.0);
    assert_eq!(snapshot.chaos_label, ChaosLabel::Zen);
}

#[tokio::test(start_paused = true)]
async fn snapshot_serializes_in_camel_case() {
    let session = session(vec![rage_frame()]);
    session.connect();
    wait_until(|| session.chaos().score() == 35.0).await;

    let value = serde_json::to_value(session.snapshot()).unwrap();
    assert_eq!(value["status"], "live");
    assert_eq!(value["chaosLabel"], "Busy");
    assert!(value["recentEvents"].is_array());
}

#[tokio::test(start_paused = true)]
async fn shutdown_goes_offline() {
    let session = session(vec![]);
    session.connect();
    wait_until(|| session.connection().status() == ConnectionStatus::Live).await;

    let status = session.connection().watch_status();
    session.shutdown().await;
    assert_eq!(*status.borrow(), ConnectionStatus::Offline);
}
