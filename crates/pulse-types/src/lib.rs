//! Shared types and constants for the officepulse workspace.
//!
//! This crate provides the foundational types used across all pulse crates:
//! the [`ActivityEvent`] that flows through the pipeline, the connection and
//! presence status enums, the animation [`EffectType`] table, and the
//! transport mode selector.
//!
//! No crate in the workspace depends on anything *except* `pulse-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

mod effect;
mod event;

pub use effect::EffectType;
pub use event::{ActivityEvent, EventKind, SYSTEM_ACTOR_ID};

/// Observable state of the connection to the relay hub.
///
/// Exactly one value holds at any instant. `Offline` is both the initial
/// state and the terminal state after retries are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// A transport is being opened.
    Connecting,
    /// The transport is open and delivering frames.
    Live,
    /// The transport dropped and a retry timer is pending.
    Reconnecting,
    /// No transport and no pending retry.
    #[default]
    Offline,
}

impl ConnectionStatus {
    /// Returns the lowercase label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Live => "live",
            Self::Reconnecting => "reconnecting",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity status of a registered actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// The actor produced an event recently.
    #[default]
    Online,
    /// The actor has been idle longer than the away threshold.
    Away,
}

impl PresenceStatus {
    /// Returns the lowercase label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
        }
    }
}

/// How the client reaches the relay hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransportMode {
    /// Duplex WebSocket push channel.
    #[default]
    #[serde(rename = "websocket")]
    WebSocket,
    /// Server-sent events over a streamed HTTP response.
    #[serde(rename = "sse")]
    Sse,
}

impl TransportMode {
    /// Returns the configuration label for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WebSocket => "websocket",
            Self::Sse => "sse",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportMode {
    type Err = ParseTransportModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "websocket" | "ws" => Ok(Self::WebSocket),
            "sse" => Ok(Self::Sse),
            _ => Err(ParseTransportModeError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown transport mode string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transport mode: {0}")]
pub struct ParseTransportModeError(pub String);

/// Control frame type the hub sends when a subscriber connects.
pub const CONNECTED_FRAME_TYPE: &str = "connected";

/// Number of rendering slots available in the presence grid.
pub const DEFAULT_SLOT_COUNT: usize = 100;

/// Number of avatar color classes.
pub const COLOR_CLASS_COUNT: usize = 6;

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    i64::try_from(since_epoch.as_millis()).unwrap_or(i64::MAX)
}
