//! Status classification.
//!
//! Turns a numeric code (plus an optional message) into an [`Error`]. Backend error
//! bodies follow the wire contract `{ "code": number, "message": string }`, see
//! [`ErrorPayload`].

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{Error, code};

/// Error body sent by the backend with a non-success status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Application error code.
    pub code: i64,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorPayload {
    /// Create a payload.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Classify this payload into an [`Error`].
    ///
    /// A backend code is always an [`Error::Http`], even when it equals a reserved
    /// pipeline code.
    #[must_use]
    pub fn classify(&self) -> Error {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| default_message(self.code));
        Error::new(self.code, message)
    }
}

/// Map a code and an optional message to an [`Error`].
///
/// Reserved codes without a message are pipeline conditions and become their
/// dedicated variant. Anything else is a classified [`Error::Http`] carrying the code
/// unchanged, with the message unchanged or a default one when absent.
///
/// # Example
///
/// ```
/// use fetchline_core::{Error, classify};
///
/// let err = classify(500, Some("boom"));
/// assert_eq!(err.code(), 500);
/// assert_eq!(err.message(), "boom");
///
/// assert!(matches!(classify(701, None), Error::MissingStreamHandler));
/// ```
#[must_use]
pub fn classify(code: i64, message: Option<&str>) -> Error {
    match (code, message) {
        (code::MISSING_STREAM_HANDLER, None) => Error::MissingStreamHandler,
        (code::NO_BODY, None) => Error::NoBody,
        (code::TIMEOUT, None) => Error::Timeout,
        (code::SUPERSEDED, None) => Error::Superseded,
        (value, Some(message)) => Error::new(value, message),
        (value, None) => Error::new(value, default_message(value)),
    }
}

/// Classify a non-success response from its status and buffered body.
///
/// The body is expected to be an [`ErrorPayload`]. Otherwise the status becomes the
/// code and the body text (or the reason phrase when empty) the message.
#[must_use]
pub fn classify_response(status: u16, body: &[u8]) -> Error {
    if let Ok(payload) = crate::from_json::<ErrorPayload>(body) {
        return payload.classify();
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let status = i64::from(status);
    if text.is_empty() {
        Error::new(status, default_message(status))
    } else {
        Error::new(status, text)
    }
}

/// Default message for a code.
#[must_use]
pub fn default_message(code: i64) -> String {
    let message = match code {
        code::REQUEST_FAILED => "request failed",
        code::STREAM_COMPLETED => "stream completed",
        code::MISSING_STREAM_HANDLER => "stream handler missing",
        code::NO_BODY => "response body unavailable for streaming",
        code::TIMEOUT => "request timeout",
        code::SUPERSEDED => "request superseded",
        other => u16::try_from(other)
            .ok()
            .and_then(|status| StatusCode::from_u16(status).ok())
            .and_then(|status| status.canonical_reason())
            .unwrap_or("request failed"),
    };
    message.to_string()
}
