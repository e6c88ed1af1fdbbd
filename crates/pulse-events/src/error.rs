//! Field-level validation errors.

/// A single rejected field of an inbound payload.
///
/// Validation collects every failing field rather than stopping at the
/// first one, so the resulting error event names all of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    /// Wire name of the offending field (e.g. `userId`).
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Joins field errors into the `field: message; field: message` detail
/// string carried by error events.
pub fn error_detail(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
