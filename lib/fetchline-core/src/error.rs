//! Error types for fetchline.
//!
//! Every failure that leaves the pipeline is an [`Error`]. The enum variant is the
//! discriminant: [`Error::Http`] carries a code and message declared by the backend,
//! the other variants are raised by the pipeline or the transport and map to the
//! reserved codes in [`crate::code`].

use std::borrow::Cow;

use derive_more::{Display, Error, From};

use crate::code;

/// Main error type for fetchline operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Application error declared by the backend (`{ code, message }` body).
    #[display("HTTP error {code}: {message}")]
    #[from(skip)]
    Http {
        /// Code supplied by the server.
        code: i64,
        /// Message supplied by the server.
        #[error(not(source))]
        message: String,
    },

    /// A request-side interceptor rejected the configuration.
    #[display("interceptor error: {_0}")]
    #[from(skip)]
    Interceptor(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// A newer identical request aborted this one.
    #[display("request superseded by a newer identical request")]
    #[from(skip)]
    Superseded,

    /// The streaming path was reached without a stream handler.
    #[display("stream handler missing")]
    #[from(skip)]
    MissingStreamHandler,

    /// The response carries no readable body to stream.
    #[display("response body unavailable for streaming")]
    #[from(skip)]
    NoBody,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// Response body could not be decoded for its declared content type.
    #[display("decode error: {_0}")]
    #[from(skip)]
    Decode(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Query string serialization error.
    #[display("query serialization error: {_0}")]
    #[from]
    QuerySerialization(serde_html_form::ser::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a classified error from a code and a message.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self::Http {
            code,
            message: message.into(),
        }
    }

    /// Create an interceptor error.
    #[must_use]
    pub fn interceptor(message: impl Into<String>) -> Self {
        Self::Interceptor(message.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable numeric code of this error.
    ///
    /// Server-declared errors keep the server code. Pipeline conditions use the
    /// reserved codes of [`crate::code`]; every other failure is reported as
    /// [`code::REQUEST_FAILED`].
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Http { code, .. } => *code,
            Self::Timeout => code::TIMEOUT,
            Self::Superseded => code::SUPERSEDED,
            Self::MissingStreamHandler => code::MISSING_STREAM_HANDLER,
            Self::NoBody => code::NO_BODY,
            _ => code::REQUEST_FAILED,
        }
    }

    /// Human-readable message, without the code prefix.
    #[must_use]
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            Self::Http { message, .. }
            | Self::Interceptor(message)
            | Self::Connection(message)
            | Self::InvalidRequest(message)
            | Self::Decode(message) => Cow::Borrowed(message),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Returns `true` if this error was declared by the backend.
    #[must_use]
    pub const fn is_http(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    /// Returns `true` for conditions raised by the pipeline itself, using a reserved code.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Superseded | Self::MissingStreamHandler | Self::NoBody
        )
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if a newer identical request replaced this one.
    ///
    /// Such failures are benign and usually ignored by callers.
    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }

    /// Returns `true` if this is a backend error with a 4xx code.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.is_http() && (400..500).contains(&self.code())
    }

    /// Returns `true` if this is a backend error with a 5xx code.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.is_http() && (500..600).contains(&self.code())
    }
}
