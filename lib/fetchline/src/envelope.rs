//! Response envelope.
//!
//! A [`FetchResponse`] is the transport response plus the configuration that produced
//! it. It flows through the response interceptors; the last stage uses the
//! configuration to release the pending-request registration.

use std::fmt;

use derive_more::From;
use fetchline_core::{
    Error, Response, ResponseData, ResponseHead, Result, StreamingBody, StreamingResponse,
    classify_response,
};

use crate::FetchConfig;

/// Transport response with a back-reference to its configuration.
pub struct FetchResponse {
    config: FetchConfig,
    head: ResponseHead,
    body: Option<StreamingBody>,
    data: Option<ResponseData>,
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("config", &self.config)
            .field("head", &self.head)
            .field("has_body", &self.body.is_some())
            .field("data", &self.data)
            .finish()
    }
}

impl FetchResponse {
    /// Wrap a transport response.
    #[must_use]
    pub fn new(config: FetchConfig, response: StreamingResponse) -> Self {
        let (head, body) = response.into_parts();
        Self {
            config,
            head,
            body,
            data: None,
        }
    }

    /// Configuration that produced this response.
    #[must_use]
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Mutable access to the configuration.
    pub const fn config_mut(&mut self) -> &mut FetchConfig {
        &mut self.config
    }

    /// Status and headers.
    #[must_use]
    pub const fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.head.status()
    }

    /// Returns `true` for 2xx responses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.head.is_success()
    }

    /// Returns `true` while the body has not been consumed.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Take the streaming body; later calls return `None`.
    pub fn take_body(&mut self) -> Option<StreamingBody> {
        self.body.take()
    }

    /// Read the remaining body into a buffered response.
    ///
    /// A consumed or missing body reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body fails.
    pub async fn read_body(&mut self) -> Result<Response> {
        let streaming = match self.body.take() {
            Some(body) => StreamingResponse::new(
                self.head.status(),
                self.head.headers().clone(),
                body,
            ),
            None => StreamingResponse::without_body(self.head.status(), self.head.headers().clone()),
        };
        streaming.collect().await
    }

    /// Resolved data, once the status/content stage ran.
    #[must_use]
    pub const fn data(&self) -> Option<&ResponseData> {
        self.data.as_ref()
    }

    /// Set the resolved data.
    pub fn set_data(&mut self, data: ResponseData) {
        self.data = Some(data);
    }

    /// Consume into the resolved data.
    #[must_use]
    pub fn into_data(self) -> Option<ResponseData> {
        self.data
    }

    /// Consume into configuration, head and remaining body.
    #[must_use]
    pub fn into_parts(self) -> (FetchConfig, ResponseHead, Option<StreamingBody>) {
        (self.config, self.head, self.body)
    }
}

/// Rejection flowing through the response interceptors.
#[derive(Debug, From)]
pub enum Rejection {
    /// Non-success response; its body is the error payload still to be read.
    #[from(skip)]
    Status(Box<FetchResponse>),
    /// Fully formed error.
    Error(Error),
}

impl From<FetchResponse> for Rejection {
    fn from(response: FetchResponse) -> Self {
        Self::Status(Box::new(response))
    }
}

impl Rejection {
    /// Turn the rejection into an error.
    ///
    /// A rejected response has its body read and classified: a `{code, message}`
    /// payload keeps the server's code and message, anything else falls back to the
    /// HTTP status.
    pub async fn into_error(self) -> Error {
        match self {
            Self::Error(error) => error,
            Self::Status(mut response) => {
                let status = response.status();
                match response.read_body().await {
                    Ok(buffered) => classify_response(status, buffered.body()),
                    Err(error) => error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::{check, let_assert};

    use super::*;
    use crate::{FetchDefaults, RequestConfig};

    fn response(status: u16, body: &'static str) -> FetchResponse {
        let config = FetchConfig::resolve(
            "https://example.com/x",
            &FetchDefaults::default(),
            RequestConfig::new(),
        )
        .expect("config");
        let headers = HashMap::from([("content-type".to_string(), "application/json".to_string())]);
        FetchResponse::new(config, StreamingResponse::buffered(status, headers, body))
    }

    #[tokio::test]
    async fn rejected_payload_is_classified() {
        let rejection = Rejection::from(response(500, r#"{"code":500,"message":"boom"}"#));
        let error = rejection.into_error().await;
        check!(error.code() == 500);
        check!(error.message() == "boom");
        check!(error.is_http());
    }

    #[tokio::test]
    async fn rejected_response_without_payload_uses_status() {
        let rejection = Rejection::from(response(404, ""));
        let error = rejection.into_error().await;
        check!(error.code() == 404);
        check!(error.message() == "Not Found");
    }

    #[tokio::test]
    async fn error_passes_through() {
        let error = Rejection::from(Error::Timeout).into_error().await;
        let_assert!(Error::Timeout = error);
    }

    #[tokio::test]
    async fn body_is_read_once() {
        let mut response = response(200, r#"{"x":1}"#);
        check!(response.has_body());

        let buffered = response.read_body().await.expect("body");
        check!(buffered.body().as_ref() == br#"{"x":1}"#);
        check!(!response.has_body());

        let again = response.read_body().await.expect("empty");
        check!(again.body().is_empty());
    }
}
