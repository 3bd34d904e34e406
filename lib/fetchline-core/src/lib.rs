//! Core types and traits for the fetchline HTTP request pipeline.
//!
//! This crate provides the transport-independent building blocks:
//! - [`Error`] and [`Result`] - Error handling, with [`classify`] mapping codes to errors
//! - [`code`] - Reserved pipeline codes
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - Transport-level requests
//! - [`StreamingResponse`], [`Response`] and [`ResponseHead`] - Transport-level responses
//! - [`Transport`] - The fetch-compatible primitive the pipeline runs on
//! - [`ResponseData`] - Values a successful request resolves to
//! - [`Utf8Decoder`] and [`TextStream`] - Incremental decoding of streamed bodies
//! - [`Form`] and [`Part`] - Multipart form data

mod body;
mod classify;
pub mod code;
mod data;
mod decode;
mod error;
mod method;
mod multipart;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use body::{ContentKind, JSON_CONTENT_TYPE, from_json, from_value, to_json, to_query_string};
pub use classify::{ErrorPayload, classify, classify_response, default_message};
pub use data::{Blob, ResponseData, StreamCompletion};
pub use decode::{TextChunk, TextStream, Utf8Decoder, decode_text};
pub use error::{Error, Result};
pub use method::Method;
pub use multipart::{Form, Part, boundary_from_content_type};
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseHead, StreamingBody, StreamingResponse};
pub use transport::Transport;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
