//! Inbound payload validation for the officepulse pipeline.
//!
//! Every frame the connection manager receives passes through this crate
//! and comes out as exactly one [`ActivityEvent`]:
//!
//! - a valid payload becomes a `kind = event` event with trimmed fields, a
//!   display preview, and a relative-time label;
//! - an invalid payload becomes a `kind = error` event attributed to the
//!   `system` actor, whose `error_detail` lists every failing field.
//!
//! Validation failures are data, not faults: they are never dropped and never
//! propagated as errors across the event stream.
//!
//! # Core functions
//!
//! - [`decode_frame`] — JSON decoding and `{type, data}` unwrapping
//! - [`validate`] — field checks producing a [`NormalizedPayload`]
//! - [`ingest`] — validate and build the resulting event

pub mod error;
pub mod types;
pub mod validation;

pub use error::{error_detail, FieldError};
pub use pulse_types::ActivityEvent;
pub use types::{Frame, NormalizedPayload};
pub use validation::{
    build_error_event, build_event, decode_frame, ingest, preview, relative_time, validate,
    PREVIEW_MAX_CHARS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_types::{EventKind, SYSTEM_ACTOR_ID};
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn valid_payload() -> serde_json::Value {
        json!({
            "userId": "  u1 ",
            "displayName": " Alex Chen ",
            "action": "rage",
            "messageText": "  the build is broken again  ",
            "mediaUrl": " https://media.example.com/rage.gif ",
            "timestamp": 1000
        })
    }

    // -----------------------------------------------------------------------
    // validate
    // -----------------------------------------------------------------------

    #[test]
    fn test_valid_payload_is_trimmed() {
        let payload = validate(&valid_payload(), NOW).unwrap();
        assert_eq!(payload.user_id, "u1");
        assert_eq!(payload.display_name, "Alex Chen");
        assert_eq!(payload.action, "rage");
        assert_eq!(payload.message_text, "the build is broken again");
        assert_eq!(
            payload.media_url.as_deref(),
            Some("https://media.example.com/rage.gif")
        );
        assert_eq!(payload.timestamp, 1000);
    }

    #[test]
    fn test_missing_timestamp_defaults_to_now() {
        let mut raw = valid_payload();
        raw.as_object_mut().unwrap().remove("timestamp");
        assert_eq!(validate(&raw, NOW).unwrap().timestamp, NOW);

        raw["timestamp"] = json!(null);
        assert_eq!(validate(&raw, NOW).unwrap().timestamp, NOW);
    }

    #[test]
    fn test_zero_and_integral_float_timestamps_accepted() {
        let mut raw = valid_payload();
        raw["timestamp"] = json!(0);
        assert_eq!(validate(&raw, NOW).unwrap().timestamp, 0);
        raw["timestamp"] = json!(2500.0);
        assert_eq!(validate(&raw, NOW).unwrap().timestamp, 2500);
    }

    #[test]
    fn test_bad_timestamps_rejected() {
        for bad in [json!(-1), json!(1.5), json!("1000"), json!(true), json!(u64::MAX)] {
            let mut raw = valid_payload();
            raw["timestamp"] = bad.clone();
            let errors = validate(&raw, NOW).unwrap_err();
            assert_eq!(errors.len(), 1, "timestamp {bad} should fail alone");
            assert_eq!(errors[0].field, "timestamp");
        }
    }

    #[test]
    fn test_empty_payload_reports_four_required_fields() {
        let errors = validate(&json!({}), NOW).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["userId", "displayName", "action", "messageText"]);
    }

    #[test]
    fn test_whitespace_and_wrong_types_rejected() {
        let raw = json!({
            "userId": "   ",
            "displayName": 42,
            "action": ["rage"],
            "messageText": null
        });
        let errors = validate(&raw, NOW).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors[1]
            .message
            .contains("required and must be a non-empty string"));
    }

    #[test]
    fn test_media_url_rules() {
        let mut raw = valid_payload();
        raw["mediaUrl"] = json!(null);
        assert_eq!(validate(&raw, NOW).unwrap().media_url, None);

        raw["mediaUrl"] = json!("  ");
        let errors = validate(&raw, NOW).unwrap_err();
        assert_eq!(errors[0].field, "mediaUrl");

        raw["mediaUrl"] = json!(7);
        assert!(validate(&raw, NOW).is_err());
    }

    #[test]
    fn test_non_object_payload_fails_every_required_field() {
        let errors = validate(&json!("not an object"), NOW).unwrap_err();
        assert_eq!(errors.len(), 4);
        let errors = validate(&json!([1, 2, 3]), NOW).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    // -----------------------------------------------------------------------
    // ingest / event construction
    // -----------------------------------------------------------------------

    #[test]
    fn test_ingest_valid_payload_builds_event() {
        let event = ingest(&valid_payload(), NOW);
        assert_eq!(event.kind, EventKind::Event);
        assert!(!event.is_error());
        assert_eq!(event.actor_id, "u1");
        assert_eq!(event.message_text, "the build is broken again");
        assert_eq!(event.preview, event.message_text);
        assert_eq!(event.error_detail, None);
        assert_eq!(event.relative_time, "19675 days ago");
    }

    #[test]
    fn test_ingest_empty_payload_builds_error_event() {
        let event = ingest(&json!({}), NOW);
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(event.actor_id, SYSTEM_ACTOR_ID);
        assert_eq!(event.display_name, "System Error");
        assert_eq!(event.action, "error");
        assert_eq!(event.message_text, "Invalid event payload received: {}");
        assert_eq!(event.timestamp, NOW);
        assert_eq!(event.relative_time, "just now");

        let detail = event.error_detail.as_deref().unwrap();
        for field in ["userId", "displayName", "action", "messageText"] {
            assert!(detail.contains(field), "detail should mention {field}");
        }
        assert_eq!(detail.matches("; ").count(), 3);
        assert!(event.preview.starts_with("Validation failed: userId: "));
        assert!(event.preview.chars().count() <= PREVIEW_MAX_CHARS);
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = ingest(&valid_payload(), NOW);
        let b = ingest(&valid_payload(), NOW);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_error_detail_format() {
        let errors = vec![
            FieldError::new("userId", "missing"),
            FieldError::new("action", "empty"),
        ];
        assert_eq!(error_detail(&errors), "userId: missing; action: empty");
    }

    // -----------------------------------------------------------------------
    // preview / relative time
    // -----------------------------------------------------------------------

    #[test]
    fn test_preview_caps_at_120_chars() {
        let short = "a".repeat(120);
        assert_eq!(preview(&short), short);

        let long = "b".repeat(121);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 120);
        assert!(p.ends_with("..."));
        assert_eq!(&p[..117], &long[..117]);
    }

    #[test]
    fn test_preview_counts_characters_not_bytes() {
        let text = "é".repeat(130);
        let p = preview(&text);
        assert_eq!(p.chars().count(), 120);
    }

    #[test]
    fn test_relative_time_buckets() {
        let s = 1000;
        assert_eq!(relative_time(NOW, NOW), "just now");
        assert_eq!(relative_time(NOW - 59 * s, NOW), "just now");
        assert_eq!(relative_time(NOW - 60 * s, NOW), "1 minute ago");
        assert_eq!(relative_time(NOW - 150 * s, NOW), "2 minutes ago");
        assert_eq!(relative_time(NOW - 3600 * s, NOW), "1 hour ago");
        assert_eq!(relative_time(NOW - 5 * 3600 * s, NOW), "5 hours ago");
        assert_eq!(relative_time(NOW - 24 * 3600 * s, NOW), "1 day ago");
        assert_eq!(relative_time(NOW - 72 * 3600 * s, NOW), "3 days ago");
        assert_eq!(relative_time(NOW + 10 * s, NOW), "just now");
    }

    // -----------------------------------------------------------------------
    // decode_frame
    // -----------------------------------------------------------------------

    #[test]
    fn test_decode_connected_control_frame() {
        let frame = decode_frame(r#"{"type":"connected","ts":1700000000000}"#);
        assert_eq!(
            frame,
            Frame::Control {
                frame_type: "connected".to_string(),
                ts: Some(1_700_000_000_000)
            }
        );
    }

    #[test]
    fn test_decode_unwraps_data_field() {
        let frame = decode_frame(r#"{"type":"activity","data":{"userId":"u1"}}"#);
        assert_eq!(frame, Frame::Activity(json!({"userId": "u1"})));
    }

    #[test]
    fn test_decode_flat_frame_is_payload() {
        let text = r#"{"type":"slack_message_action","userId":"u1","action":"rage"}"#;
        match decode_frame(text) {
            Frame::Activity(v) => {
                assert_eq!(v["userId"], "u1");
                assert_eq!(v["type"], "slack_message_action");
            }
            other => panic!("expected activity, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_null_data_keeps_whole_frame() {
        match decode_frame(r#"{"data":null,"userId":"u1"}"#) {
            Frame::Activity(v) => assert_eq!(v["userId"], "u1"),
            other => panic!("expected activity, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_garbage_becomes_error_event() {
        let frame = decode_frame("definitely not json");
        let Frame::Activity(raw) = frame else {
            panic!("garbage should be an activity payload");
        };
        assert_eq!(raw, json!("definitely not json"));
        let event = ingest(&raw, NOW);
        assert!(event.is_error());
        assert!(event.message_text.contains("definitely not json"));
    }
}
