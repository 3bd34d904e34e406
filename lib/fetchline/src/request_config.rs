//! Per-call configuration.
//!
//! A [`RequestConfig`] carries the caller overrides; every field is optional.
//! [`FetchConfig::resolve`] merges it over the [`FetchDefaults`] and produces the
//! configuration that flows through the pipeline: URL resolved exactly once, body
//! serialized, handlers attached.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fetchline_core::{Form, Method, Request, ResponseHead, Result, to_json, to_query_string};
use futures_util::future::AbortRegistration;
use serde::Serialize;
use url::Url;

use crate::FetchDefaults;
use crate::pending::PendingTicket;

/// Called once per streamed chunk with the raw bytes and the text they completed.
pub type StreamHandler = Arc<dyn Fn(&Bytes, &str) + Send + Sync>;

/// Called once with the response head, before the first streamed chunk.
pub type ReadyHandler = Arc<dyn Fn(&ResponseHead) + Send + Sync>;

// ============================================================================
// Caller overrides
// ============================================================================

/// Caller overrides for a single request.
///
/// # Example
///
/// ```
/// use fetchline::{Method, RequestConfig};
/// use std::time::Duration;
///
/// let config = RequestConfig::new()
///     .method(Method::Post)
///     .timeout(Duration::from_secs(30))
///     .header("X-Trace", "1")
///     .data(&serde_json::json!({"title": "hello"}))
///     .expect("serializable");
/// ```
#[derive(Clone, Default)]
pub struct RequestConfig {
    method: Option<Method>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    headers: HashMap<String, String>,
    params: Option<serde_json::Value>,
    data: Option<serde_json::Value>,
    body: Option<Bytes>,
    cancel: Option<bool>,
    blob: bool,
    on_stream: Option<StreamHandler>,
    on_ready: Option<ReadyHandler>,
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("body", &self.body.as_ref().map(Bytes::len))
            .field("cancel", &self.cancel)
            .field("blob", &self.blob)
            .field("on_stream", &self.on_stream.is_some())
            .field("on_ready", &self.on_ready.is_some())
            .finish()
    }
}

impl RequestConfig {
    /// Create an empty override set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method.
    #[must_use]
    pub const fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the base URL for this request.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the timeout for this request.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add or replace a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn params<P: Serialize + ?Sized>(mut self, params: &P) -> Result<Self> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    /// Set the body payload, serialized as JSON when the request is resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    pub fn data<D: Serialize + ?Sized>(mut self, data: &D) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// Send a multipart form body.
    ///
    /// Sets the `Content-Type` with the form boundary.
    #[must_use]
    pub fn form(mut self, form: Form) -> Self {
        let (content_type, body) = form.into_body();
        self.headers
            .retain(|name, _| !name.eq_ignore_ascii_case("content-type"));
        self.headers.insert("Content-Type".to_string(), content_type);
        self.body = Some(body);
        self
    }

    /// Send a pre-serialized body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Opt in or out of de-duplication (enabled by default).
    #[must_use]
    pub const fn cancel(mut self, cancel: bool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Resolve the response body as a raw [`Blob`](fetchline_core::Blob), whatever its
    /// content type.
    #[must_use]
    pub const fn blob(mut self) -> Self {
        self.blob = true;
        self
    }

    /// Consume the response as a text stream, chunk by chunk.
    #[must_use]
    pub fn on_stream<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Bytes, &str) + Send + Sync + 'static,
    {
        self.on_stream = Some(Arc::new(handler));
        self
    }

    /// Be notified once the streamed response head is available.
    #[must_use]
    pub fn on_ready<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ResponseHead) + Send + Sync + 'static,
    {
        self.on_ready = Some(Arc::new(handler));
        self
    }
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Configuration of one request after merging defaults and overrides.
///
/// Consumed once by the pipeline. While registered for de-duplication it holds the
/// [`PendingTicket`]; dropping the configuration releases it.
pub struct FetchConfig {
    method: Method,
    base_url: Option<String>,
    url: Url,
    timeout: Duration,
    headers: HashMap<String, String>,
    params: Option<serde_json::Value>,
    data: Option<serde_json::Value>,
    body: Option<Bytes>,
    cancel: Option<bool>,
    blob: bool,
    on_stream: Option<StreamHandler>,
    on_ready: Option<ReadyHandler>,
    pending: Option<PendingTicket>,
    abort: Option<AbortRegistration>,
}

impl fmt::Debug for FetchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchConfig")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(Bytes::len))
            .field("cancel", &self.cancel)
            .field("blob", &self.blob)
            .field("streaming", &self.on_stream.is_some())
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl FetchConfig {
    /// Merge the caller overrides over the defaults and resolve the request.
    ///
    /// Caller values win field by field; headers merge per name, case-insensitively.
    /// Relative URLs are joined to the base URL, `params` become the query string and
    /// `data` becomes a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be resolved or a payload cannot be encoded.
    pub fn resolve(url: &str, defaults: &FetchDefaults, config: RequestConfig) -> Result<Self> {
        let RequestConfig {
            method,
            base_url,
            timeout,
            headers: overrides,
            params,
            data,
            body,
            cancel,
            blob,
            on_stream,
            on_ready,
        } = config;

        let base_url = base_url.or_else(|| defaults.base_url.clone());
        let mut headers = defaults.headers.clone();
        for (name, value) in overrides {
            headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
            headers.insert(name, value);
        }

        let url = resolve_url(url, base_url.as_deref(), params.as_ref())?;
        let body = match &data {
            Some(data) => Some(to_json(data)?),
            None => body,
        };

        Ok(Self {
            method: method.unwrap_or(defaults.method),
            base_url,
            url,
            timeout: timeout.unwrap_or(defaults.timeout),
            headers,
            params,
            data,
            body,
            cancel,
            blob,
            on_stream,
            on_ready,
            pending: None,
            abort: None,
        })
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Base URL used to resolve a relative URL.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Resolved absolute URL, query string included.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Override the timeout.
    pub const fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Add or replace a header (case-insensitive name).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Query parameters the URL was built from.
    #[must_use]
    pub const fn params(&self) -> Option<&serde_json::Value> {
        self.params.as_ref()
    }

    /// Body payload before serialization.
    #[must_use]
    pub const fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Serialized body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// De-duplication flag; `None` until the request stage applies the default.
    #[must_use]
    pub const fn cancel(&self) -> Option<bool> {
        self.cancel
    }

    /// Set the de-duplication flag.
    pub const fn set_cancel(&mut self, cancel: bool) {
        self.cancel = Some(cancel);
    }

    /// Returns `true` if the body resolves as a raw blob.
    #[must_use]
    pub const fn wants_blob(&self) -> bool {
        self.blob
    }

    /// Stream handler, if the response is consumed as a stream.
    #[must_use]
    pub const fn on_stream(&self) -> Option<&StreamHandler> {
        self.on_stream.as_ref()
    }

    /// Ready handler.
    #[must_use]
    pub const fn on_ready(&self) -> Option<&ReadyHandler> {
        self.on_ready.as_ref()
    }

    /// Returns `true` while registered in a pending-request tracker.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn set_pending(&mut self, ticket: PendingTicket, abort: AbortRegistration) {
        self.pending = Some(ticket);
        self.abort = Some(abort);
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingTicket> {
        self.abort = None;
        self.pending.take()
    }

    pub(crate) fn take_abort_registration(&mut self) -> Option<AbortRegistration> {
        self.abort.take()
    }

    /// Build the transport request.
    #[must_use]
    pub fn to_request(&self) -> Request {
        Request::builder(self.method, self.url.clone())
            .headers(self.headers.clone())
            .maybe_body(self.body.clone())
            .build()
    }
}

/// Resolve the request URL.
///
/// Absolute `http(s)` URLs are used as given; anything else is joined to the base URL.
/// Query parameters are appended, after any query the URL already carries.
fn resolve_url(
    url: &str,
    base_url: Option<&str>,
    params: Option<&serde_json::Value>,
) -> Result<Url> {
    let mut target = match base_url {
        Some(base) if !is_absolute(url) => join(base, url),
        _ => url.to_string(),
    };

    if let Some(params) = params.filter(|params| !params.is_null()) {
        let query = to_query_string(params)?;
        if !query.is_empty() {
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&query);
        }
    }

    Ok(Url::parse(&target)?)
}

fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn join(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
