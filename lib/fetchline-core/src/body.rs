//! Body serialization utilities and content-type dispatch.

use bytes::Bytes;

use crate::Result;

/// Content type of the JSON request bodies the pipeline produces.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// How a response body is interpreted, decided by its declared `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// `application/json` - parsed into a structured value.
    Json,
    /// `text/*` - decoded text.
    Text,
    /// `image/*` - binary blob.
    Image,
    /// `multipart/form-data` - parsed into a form.
    Multipart,
    /// Anything else - decoded text.
    Other,
}

impl ContentKind {
    /// Classify a `Content-Type` header value.
    ///
    /// The checks run in a fixed order, so `text/json` is text and
    /// `application/json; charset=utf-8` is JSON.
    ///
    /// # Example
    ///
    /// ```
    /// use fetchline_core::ContentKind;
    ///
    /// assert_eq!(ContentKind::from_header("application/json"), ContentKind::Json);
    /// assert_eq!(ContentKind::from_header("text/event-stream"), ContentKind::Text);
    /// assert_eq!(ContentKind::from_header(""), ContentKind::Other);
    /// ```
    #[must_use]
    pub fn from_header(content_type: &str) -> Self {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.contains("application/json") {
            Self::Json
        } else if content_type.starts_with("text/") {
            Self::Text
        } else if content_type.contains("image/") {
            Self::Image
        } else if content_type.contains("multipart/form-data") {
            Self::Multipart
        } else {
            Self::Other
        }
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use fetchline_core::to_json;
///
/// let bytes = to_json(&serde_json::json!({"a": 1})).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"a":1}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to a query string.
///
/// Uses `serde_html_form` which supports `Vec<T>` for repeated query parameters
/// (e.g., `?tags=a&tags=b&tags=c`).
///
/// # Errors
///
/// Returns an error if query serialization fails.
///
/// # Example
///
/// ```
/// use fetchline_core::to_query_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Search {
///     q: String,
///     #[serde(skip_serializing_if = "Option::is_none")]
///     page: Option<u32>,
/// }
///
/// let search = Search { q: "rust".to_string(), page: Some(1) };
/// let query = to_query_string(&search).expect("serialize");
/// assert_eq!(query, "q=rust&page=1");
/// ```
pub fn to_query_string<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_html_form::to_string(value).map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

/// Convert an already-parsed JSON value into a typed value, with path-aware errors.
///
/// # Errors
///
/// Returns an error if the value does not match `T`.
pub fn from_value<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_path_to_error::deserialize(value).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
