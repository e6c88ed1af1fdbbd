//! Payload validation and event construction.
//!
//! Inbound payloads are untrusted: any field may be absent, null, or of the
//! wrong JSON type. [`validate`] checks every field and collects all
//! failures; [`ingest`] turns the outcome into exactly one
//! [`ActivityEvent`], valid or error.

use crate::error::{error_detail, FieldError};
use crate::types::{Frame, NormalizedPayload};
use pulse_types::{ActivityEvent, EventKind, CONNECTED_FRAME_TYPE, SYSTEM_ACTOR_ID};
use serde_json::Value;
use uuid::Uuid;

/// Maximum preview length in characters, including the ellipsis marker.
pub const PREVIEW_MAX_CHARS: usize = 120;

const ELLIPSIS: &str = "...";

const REQUIRED_FIELDS: [&str; 4] = ["userId", "displayName", "action", "messageText"];

/// Validates a raw payload.
///
/// Required string fields are trimmed and must be non-empty. `mediaUrl`, if
/// present and not null, must be a non-empty string. `timestamp`, if present
/// and not null, must be a non-negative integer; otherwise `now_ms` is used.
///
/// # Errors
///
/// Returns every failing field, in field order.
pub fn validate(payload: &Value, now_ms: i64) -> Result<NormalizedPayload, Vec<FieldError>> {
    let mut errors = Vec::new();

    let required = REQUIRED_FIELDS.map(|field| {
        let value = payload
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if value.is_none() {
            errors.push(FieldError::new(
                field,
                format!("{field} is required and must be a non-empty string"),
            ));
        }
        value.map(str::to_string)
    });

    let media_url = match payload.get("mediaUrl") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(_) => {
            errors.push(FieldError::new(
                "mediaUrl",
                "mediaUrl must be a non-empty string if provided",
            ));
            None
        }
    };

    let timestamp = match payload.get("timestamp") {
        None | Some(Value::Null) => Some(now_ms),
        Some(Value::Number(n)) => non_negative_integer(n),
        Some(_) => None,
    };
    if timestamp.is_none() {
        errors.push(FieldError::new(
            "timestamp",
            "timestamp must be a non-negative integer if provided",
        ));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let [user_id, display_name, action, message_text] = required;
    Ok(NormalizedPayload {
        user_id: user_id.unwrap_or_default(),
        display_name: display_name.unwrap_or_default(),
        action: action.unwrap_or_default(),
        message_text: message_text.unwrap_or_default(),
        media_url,
        timestamp: timestamp.unwrap_or(now_ms),
    })
}

/// Accepts integral JSON numbers (including `1000.0`) in `0..=i64::MAX`.
fn non_negative_integer(n: &serde_json::Number) -> Option<i64> {
    if let Some(v) = n.as_i64() {
        return (v >= 0).then_some(v);
    }
    if n.as_u64().is_some() {
        // Above i64::MAX.
        return None;
    }
    n.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Builds a valid activity event from a normalized payload.
pub fn build_event(payload: NormalizedPayload, now_ms: i64) -> ActivityEvent {
    ActivityEvent {
        id: Uuid::new_v4(),
        preview: preview(&payload.message_text),
        relative_time: relative_time(payload.timestamp, now_ms),
        actor_id: payload.user_id,
        display_name: payload.display_name,
        action: payload.action,
        message_text: payload.message_text,
        media_url: payload.media_url,
        timestamp: payload.timestamp,
        kind: EventKind::Event,
        error_detail: None,
    }
}

/// Builds the error event that stands in for a rejected payload.
///
/// The raw payload is embedded in `message_text` so the failure remains
/// auditable from the event log.
pub fn build_error_event(errors: &[FieldError], raw: &Value, now_ms: i64) -> ActivityEvent {
    let detail = error_detail(errors);
    ActivityEvent {
        id: Uuid::new_v4(),
        actor_id: SYSTEM_ACTOR_ID.to_string(),
        display_name: "System Error".to_string(),
        action: "error".to_string(),
        message_text: format!("Invalid event payload received: {raw}"),
        preview: preview(&format!("Validation failed: {detail}")),
        relative_time: relative_time(now_ms, now_ms),
        media_url: None,
        timestamp: now_ms,
        kind: EventKind::Error,
        error_detail: Some(detail),
    }
}

/// Validates a raw payload and returns exactly one event for it.
pub fn ingest(raw: &Value, now_ms: i64) -> ActivityEvent {
    match validate(raw, now_ms) {
        Ok(payload) => build_event(payload, now_ms),
        Err(errors) => {
            tracing::warn!(
                error_count = errors.len(),
                detail = %error_detail(&errors),
                "rejected inbound activity payload"
            );
            build_error_event(&errors, raw, now_ms)
        }
    }
}

/// Decodes one transport text frame.
///
/// Text that is not JSON becomes an activity payload holding the raw string
/// (which then fails validation). A frame carrying a non-null `data` field is
/// unwrapped to it; otherwise the whole frame is the payload.
pub fn decode_frame(text: &str) -> Frame {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return Frame::Activity(Value::String(text.to_string())),
    };

    if let Some(frame_type) = value.get("type").and_then(Value::as_str) {
        if frame_type == CONNECTED_FRAME_TYPE {
            return Frame::Control {
                frame_type: frame_type.to_string(),
                ts: value.get("ts").and_then(Value::as_i64),
            };
        }
    }

    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => Frame::Activity(data),
            Some(_) | None => Frame::Activity(Value::Object(map)),
        },
        other => Frame::Activity(other),
    }
}

/// Caps message text at [`PREVIEW_MAX_CHARS`] characters.
pub fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_MAX_CHARS {
        return text.to_string();
    }
    let mut out: String = text
        .chars()
        .take(PREVIEW_MAX_CHARS - ELLIPSIS.len())
        .collect();
    out.push_str(ELLIPSIS);
    out
}

/// Formats the distance between `timestamp_ms` and `now_ms` as a coarse
/// human-readable label. Future timestamps read as "just now".
pub fn relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let seconds = now_ms.saturating_sub(timestamp_ms).max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else {
        plural(days, "day")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
