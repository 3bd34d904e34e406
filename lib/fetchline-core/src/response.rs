//! Transport-level HTTP responses.
//!
//! A [`Transport`](crate::Transport) yields a [`StreamingResponse`]: the status and
//! headers ([`ResponseHead`]) plus a body that arrives as a stream of chunks, if the
//! response has one. [`StreamingResponse::collect`] buffers it into a [`Response`].

use std::collections::HashMap;
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::request::find_header;

/// A streaming body: chunks of bytes arriving over time.
pub type StreamingBody = Pin<Box<dyn Stream<Item = crate::Result<Bytes>> + Send>>;

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    status: u16,
    headers: HashMap<String, String>,
}

impl ResponseHead {
    /// Creates a new response head.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>) -> Self {
        Self { status, headers }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Declared `Content-Type`, or an empty string.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or_default()
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

// ============================================================================
// Streaming Response
// ============================================================================

/// HTTP response with a streaming body, as returned by a transport.
pub struct StreamingResponse {
    head: ResponseHead,
    body: Option<StreamingBody>,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("head", &self.head)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl StreamingResponse {
    /// Creates a new streaming response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: StreamingBody) -> Self {
        Self {
            head: ResponseHead::new(status, headers),
            body: Some(body),
        }
    }

    /// Creates a response that has no body at all (e.g. `HEAD`, `204`).
    #[must_use]
    pub fn without_body(status: u16, headers: HashMap<String, String>) -> Self {
        Self {
            head: ResponseHead::new(status, headers),
            body: None,
        }
    }

    /// Creates a response whose body is already fully available.
    #[must_use]
    pub fn buffered(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(
            status,
            headers,
            Box::pin(futures_util::stream::once(async move { Ok::<_, crate::Error>(body) })),
        )
    }

    /// Status line and headers.
    #[must_use]
    pub const fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.head.status
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.head.is_success()
    }

    /// Returns `true` if the response carries a readable body.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Take the body stream, leaving the response bodiless.
    ///
    /// The body can only be acquired once.
    pub fn take_body(&mut self) -> Option<StreamingBody> {
        self.body.take()
    }

    /// Consume into head and body.
    #[must_use]
    pub fn into_parts(self) -> (ResponseHead, Option<StreamingBody>) {
        (self.head, self.body)
    }

    /// Buffer the entire stream into a [`Response`].
    ///
    /// A response without body yields an empty buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if reading any chunk fails.
    pub async fn collect(self) -> crate::Result<Response> {
        let Some(mut body) = self.body else {
            return Ok(Response {
                head: self.head,
                body: Bytes::new(),
            });
        };

        let mut collected = Vec::new();
        while let Some(chunk) = body.next().await {
            collected.extend_from_slice(&chunk?);
        }

        Ok(Response {
            head: self.head,
            body: Bytes::from(collected),
        })
    }
}

// ============================================================================
// Buffered Response
// ============================================================================

/// HTTP response with status, headers, and a fully buffered body.
#[derive(Debug, Clone)]
pub struct Response {
    head: ResponseHead,
    body: Bytes,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: Bytes) -> Self {
        Self {
            head: ResponseHead::new(status, headers),
            body,
        }
    }

    /// Status line and headers.
    #[must_use]
    pub const fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.head.status
    }

    /// Declared `Content-Type`, or an empty string.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.head.content_type()
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }

    /// Decode the body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
