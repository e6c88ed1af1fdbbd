//! Validated payload types.

use serde::{Deserialize, Serialize};

/// The trimmed, type-checked form of an inbound activity payload.
///
/// Produced only by [`crate::validate`]; every string field is non-empty
/// after trimming and `timestamp` has been resolved to a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPayload {
    /// Stable actor identity.
    pub user_id: String,
    /// Actor display name.
    pub display_name: String,
    /// Action keyword chosen upstream.
    pub action: String,
    /// Message text the action was derived from.
    pub message_text: String,
    /// Optional media attached upstream.
    pub media_url: Option<String>,
    /// Milliseconds since the Unix epoch; defaults to receipt time.
    pub timestamp: i64,
}

/// One inbound transport frame after JSON decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Hub control frame (e.g. the `connected` greeting). Not an activity.
    Control {
        /// The frame's `type` field.
        frame_type: String,
        /// Hub timestamp, when present.
        ts: Option<i64>,
    },
    /// An activity payload to be validated. Unparseable text is carried as
    /// a JSON string so it still yields an error event.
    Activity(serde_json::Value),
}
