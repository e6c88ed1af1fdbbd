//! `pulse-watch`: connects to a relay hub and logs what the office looks
//! like.
//!
//! Logs every connection status transition and a periodic snapshot, and
//! disconnects cleanly on Ctrl+C.

use pulse_client::{load_config, NetworkConnector, OfficeSession, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(10);

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("PULSE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() -> Result<(), pulse_client::ConfigError> {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("pulse.toml"));

    let config = load_config(selected_config_path)?;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let session = OfficeSession::start(
        SessionConfig::from(&config),
        Arc::new(NetworkConnector::new()),
    );
    let mut status = session.connection().watch_status();
    session.connect();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(SNAPSHOT_INTERVAL);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("received SIGINT, disconnecting");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                tracing::info!(
                    status = %current,
                    attempts = session.connection().reconnect_attempts(),
                    "status"
                );
            }
            _ = ticker.tick() => {
                let snapshot = session.snapshot();
                tracing::info!(
                    status = %snapshot.status,
                    actors = snapshot.actors.len(),
                    animations = snapshot.animations.len(),
                    chaos = snapshot.chaos_score,
                    label = %snapshot.chaos_label,
                    recent = snapshot.recent_events.len(),
                    "snapshot"
                );
                if let Some(latest) = snapshot.recent_events.first() {
                    tracing::info!(
                        actor_id = %latest.actor_id,
                        action = %latest.action,
                        preview = %latest.preview,
                        "latest event"
                    );
                }
            }
        }
    }

    session.shutdown().await;
    tracing::info!("pulse-watch stopped");
    Ok(())
}
