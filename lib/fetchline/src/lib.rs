//! HTTP request pipeline with interceptors, request de-duplication and streaming
//! text responses.
//!
//! A [`Fetcher`] turns a URL and a [`RequestConfig`] into [`ResponseData`]:
//!
//! 1. the configuration is merged over the [`FetchDefaults`] and the URL resolved
//! 2. request interceptors run, then the request is registered in the
//!    [`PendingRequests`] registry, aborting an identical request still in flight
//! 3. the [`Transport`] is called, bounded by the timeout
//! 4. response interceptors run: status check and content-type dispatch (or
//!    streaming), user stages, then cleanup
//!
//! Failures are always an [`Error`] with a stable numeric code.
//!
//! # Example
//!
//! ```ignore
//! use fetchline::prelude::*;
//!
//! let fetcher = Fetcher::new(
//!     FetchDefaults::builder()
//!         .base_url("https://api.example.com")
//!         .build(),
//! );
//!
//! let data = fetcher
//!     .post("/chat/new", &serde_json::json!({"title": "notes"}), RequestConfig::new())
//!     .await?;
//!
//! fetcher
//!     .execute(
//!         "/chat/completions",
//!         RequestConfig::new()
//!             .method(Method::Post)
//!             .data(&serde_json::json!({"prompt": "hello"}))?
//!             .on_stream(|_raw, text| print!("{text}")),
//!     )
//!     .await?;
//! ```

mod client;
mod config;
mod connector;
mod envelope;
mod fetcher;
mod interceptor;
pub mod middleware;
mod pending;
pub mod prelude;
mod request_config;
mod stream;

pub use client::{BoxedService, HyperTransport, HyperTransportBuilder, ServiceFuture};
pub use config::{
    DEFAULT_TIMEOUT, FetchDefaults, FetchDefaultsBuilder, TransportConfig, TransportConfigBuilder,
};
pub use envelope::{FetchResponse, Rejection};
pub use fetcher::{Fetcher, RequestInterceptors, ResponseInterceptors};
pub use interceptor::{Fulfilled, Interceptor, InterceptorId, InterceptorManager, Rejected};
pub use pending::{Fingerprint, PendingRequests, PendingTicket};
pub use request_config::{FetchConfig, ReadyHandler, RequestConfig, StreamHandler};
pub use stream::handle_stream;

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use fetchline_core::{
    Blob, ContentKind, Error, ErrorPayload, Form, Method, Part, Request, RequestBuilder, Response,
    ResponseData, ResponseHead, Result, StatusCode, StreamCompletion, StreamingBody,
    StreamingResponse, TextChunk, TextStream, Transport, Utf8Decoder, classify, classify_response,
    code, decode_text, default_message, header,
};
