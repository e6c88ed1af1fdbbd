//! The activity event that flows from the transport to every consumer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actor id carried by every error-kind event.
pub const SYSTEM_ACTOR_ID: &str = "system";

/// Whether an event carries validated activity or a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A validated activity event.
    Event,
    /// A validation failure surfaced as data.
    Error,
}

/// A normalized activity event.
///
/// Events are immutable once constructed and are only built by the
/// validator in `pulse-events`. An error-kind event always carries
/// `error_detail` and has `actor_id == SYSTEM_ACTOR_ID`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    /// Unique per event, assigned at validation time.
    pub id: Uuid,
    /// Stable identity of the actor that produced the event.
    pub actor_id: String,
    /// Human-readable name of the actor.
    pub display_name: String,
    /// Action keyword (e.g. `rage`, `joined`).
    pub action: String,
    /// Trimmed message text.
    pub message_text: String,
    /// Message text capped for display.
    pub preview: String,
    /// Relative-time label computed when the event was built.
    pub relative_time: String,
    /// Optional media attached to the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Event time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Valid event or validation error.
    pub kind: EventKind,
    /// Aggregated field errors, present only on error-kind events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ActivityEvent {
    /// Returns `true` if this event records a validation failure.
    pub fn is_error(&self) -> bool {
        self.kind == EventKind::Error
    }
}
