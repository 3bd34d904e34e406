//! Resolved response values.
//!
//! Successful responses are turned into a [`ResponseData`] according to their
//! declared content type; see [`ResponseData::from_response`].

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::{ContentKind, Error, Form, Response, Result, code};

/// Binary payload with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    content_type: String,
    data: Bytes,
}

impl Blob {
    /// Create a blob.
    #[must_use]
    pub fn new(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Declared content type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Raw data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the blob is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume into raw data.
    #[must_use]
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

/// Result of a fully consumed streaming response.
///
/// The payload itself was delivered chunk by chunk to the stream handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCompletion {
    /// Always [`code::STREAM_COMPLETED`].
    pub code: i64,
    /// Fixed completion message.
    pub message: String,
}

impl Default for StreamCompletion {
    fn default() -> Self {
        Self {
            code: code::STREAM_COMPLETED,
            message: "stream completed".to_string(),
        }
    }
}

/// Value a successful request resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// Parsed `application/json` body.
    Json(serde_json::Value),
    /// Decoded `text/*` body, or any undeclared/unknown content type.
    Text(String),
    /// `image/*` body.
    Blob(Blob),
    /// Parsed `multipart/form-data` body.
    Form(Form),
    /// Streaming response consumed through the stream handler.
    Stream(StreamCompletion),
}

impl ResponseData {
    /// Interpret a buffered response according to its declared content type.
    ///
    /// Unknown content types fall back to text and are never an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a JSON or multipart body is malformed.
    pub fn from_response(response: &Response) -> Result<Self> {
        let content_type = response.content_type();
        match ContentKind::from_header(content_type) {
            ContentKind::Json => response.json().map(Self::Json),
            ContentKind::Image => Ok(Self::Blob(Blob::new(content_type, response.body().clone()))),
            ContentKind::Multipart => Form::parse(content_type, response.body()).map(Self::Form),
            ContentKind::Text | ContentKind::Other => Ok(Self::Text(response.text())),
        }
    }

    /// Keep a buffered response as raw bytes, whatever its declared content type.
    ///
    /// An undeclared content type is reported as `application/octet-stream`.
    #[must_use]
    pub fn blob_from_response(response: &Response) -> Self {
        let content_type = match response.content_type() {
            "" => "application/octet-stream",
            declared => declared,
        };
        Self::Blob(Blob::new(content_type, response.body().clone()))
    }

    /// Deserialize into a typed value.
    ///
    /// JSON values are converted directly; text is parsed as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not match `T` or is not JSON-shaped.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => crate::from_value(value),
            Self::Text(text) => crate::from_json(text.as_bytes()),
            other => Err(Error::decode(format!(
                "expected a JSON response, got {}",
                other.kind()
            ))),
        }
    }

    /// Text content, if this is a text response.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// JSON value, if this is a JSON response.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Consume into a blob.
    ///
    /// Text and JSON payloads are re-encoded; forms are re-encoded as multipart.
    #[must_use]
    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Self::Blob(blob) => Some(blob),
            Self::Text(text) => Some(Blob::new("text/plain", text)),
            Self::Json(value) => Some(Blob::new("application/json", value.to_string())),
            Self::Form(form) => Some(Blob::new(form.content_type(), form.encode())),
            Self::Stream(_) => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Form(_) => "form",
            Self::Stream(_) => "stream",
        }
    }
}
