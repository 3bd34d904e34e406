//! Transport trait.
//!
//! A [`Transport`] performs one HTTP round-trip and returns the response head as
//! soon as it is available, with the body still streaming. The pipeline decides how
//! to consume the body.
//!
//! Implement it directly for in-memory transports in tests, or use the hyper-based
//! transport of the `fetchline` crate.

use std::future::Future;
use std::sync::Arc;

use crate::{Request, Result, StreamingResponse};

/// Fetch-compatible transport primitive.
pub trait Transport: Send + Sync {
    /// Execute an HTTP request and return the response with a streaming body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails before a response head arrives:
    /// - Network errors
    /// - TLS errors
    /// - Invalid request
    fn execute(&self, request: Request) -> impl Future<Output = Result<StreamingResponse>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(&self, request: Request) -> impl Future<Output = Result<StreamingResponse>> + Send {
        T::execute(self.as_ref(), request)
    }
}
