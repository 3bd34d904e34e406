//! The request pipeline.
//!
//! A [`Fetcher`] resolves the configuration, runs the request interceptors, calls the
//! transport and runs the response interceptors. Two stages are fixed:
//!
//! - request side, last: default `cancel` to `true` and register the request for
//!   de-duplication, so the fingerprint covers what user interceptors changed
//! - response side: the status/content stage runs first and the cleanup stage runs
//!   last, with user interceptors in between
//!
//! The cleanup stage releases the pending-request registration on both outcomes and
//! turns every rejection into an [`Error`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use fetchline_core::{Blob, Error, Form, Method, ResponseData, Result, Transport};
use futures_util::future::Abortable;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::interceptor::{Interceptor, InterceptorId, InterceptorManager};
use crate::stream::handle_stream;
use crate::{
    FetchConfig, FetchDefaults, FetchResponse, HyperTransport, PendingRequests, Rejection,
    RequestConfig,
};

/// Request-side chain: configuration in, configuration or error out.
pub type RequestInterceptors = InterceptorManager<FetchConfig, Error>;

/// Response-side chain: envelope in, envelope or rejection out.
pub type ResponseInterceptors = InterceptorManager<FetchResponse, Rejection>;

struct Inner<C> {
    transport: C,
    defaults: FetchDefaults,
    pending: PendingRequests,
    request_interceptors: Mutex<RequestInterceptors>,
    response_interceptors: Mutex<ResponseInterceptors>,
}

/// HTTP request pipeline.
///
/// Cloning is cheap; clones share the transport, the pending-request registry and the
/// interceptors.
///
/// # Example
///
/// ```ignore
/// use fetchline::{FetchDefaults, Fetcher, RequestConfig};
///
/// let fetcher = Fetcher::new(
///     FetchDefaults::builder()
///         .base_url("https://api.example.com")
///         .build(),
/// );
///
/// let sessions = fetcher.get("/session/list", &serde_json::json!({"page": 1})).await?;
///
/// fetcher
///     .execute(
///         "/chat/completions",
///         RequestConfig::new()
///             .method(fetchline::Method::Post)
///             .data(&serde_json::json!({"prompt": "hello"}))?
///             .on_stream(|_raw, text| print!("{text}")),
///     )
///     .await?;
/// ```
pub struct Fetcher<C = HyperTransport> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for Fetcher<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for Fetcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("defaults", &self.inner.defaults)
            .field("pending", &self.inner.pending.len())
            .finish_non_exhaustive()
    }
}

impl Fetcher<HyperTransport> {
    /// Create a pipeline over the default hyper transport.
    #[must_use]
    pub fn new(defaults: FetchDefaults) -> Self {
        Self::with_transport(HyperTransport::new(), defaults)
    }
}

impl Default for Fetcher<HyperTransport> {
    fn default() -> Self {
        Self::new(FetchDefaults::default())
    }
}

impl<C: Transport> Fetcher<C> {
    /// Create a pipeline over a custom transport.
    #[must_use]
    pub fn with_transport(transport: C, defaults: FetchDefaults) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                defaults,
                pending: PendingRequests::new(),
                request_interceptors: Mutex::new(RequestInterceptors::new()),
                response_interceptors: Mutex::new(ResponseInterceptors::new()),
            }),
        }
    }

    /// Default configuration.
    #[must_use]
    pub fn defaults(&self) -> &FetchDefaults {
        &self.inner.defaults
    }

    /// Registry of in-flight requests.
    #[must_use]
    pub fn pending(&self) -> &PendingRequests {
        &self.inner.pending
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &C {
        &self.inner.transport
    }

    // ========================================================================
    // Interceptors
    // ========================================================================

    /// Add a request interceptor; it runs before the de-duplication stage.
    ///
    /// A rejection raised by a request interceptor reaches the caller as a code 400
    /// error carrying its message.
    pub fn use_request_interceptor(
        &self,
        interceptor: Interceptor<FetchConfig, Error>,
    ) -> InterceptorId {
        lock(&self.inner.request_interceptors).add(interceptor)
    }

    /// Remove a request interceptor. Returns `false` if it was already removed.
    pub fn eject_request_interceptor(&self, id: InterceptorId) -> bool {
        lock(&self.inner.request_interceptors).eject(id)
    }

    /// Add a response interceptor; it runs after the status/content stage and before
    /// cleanup.
    pub fn use_response_interceptor(
        &self,
        interceptor: Interceptor<FetchResponse, Rejection>,
    ) -> InterceptorId {
        lock(&self.inner.response_interceptors).add(interceptor)
    }

    /// Remove a response interceptor. Returns `false` if it was already removed.
    pub fn eject_response_interceptor(&self, id: InterceptorId) -> bool {
        lock(&self.inner.response_interceptors).eject(id)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute a request.
    ///
    /// `url` is either absolute or joined to the base URL. Resolves to the response
    /// data dispatched by content type, or to the stream completion value when a
    /// stream handler is configured.
    ///
    /// # Errors
    ///
    /// Every failure is an [`Error`] with a stable code: the server's code for
    /// classified responses, 400 for request and transport failures, 701/702 for
    /// streaming preconditions, 703 on timeout and 704 when a newer identical request
    /// superseded this one.
    pub async fn execute(&self, url: &str, config: RequestConfig) -> Result<ResponseData> {
        let config = FetchConfig::resolve(url, &self.inner.defaults, config)?;
        let span = info_span!("fetch", method = %config.method(), url = %config.url());
        self.run(config).instrument(span).await
    }

    /// Execute a request and deserialize the JSON response.
    ///
    /// # Errors
    ///
    /// Same as [`Fetcher::execute`], plus a deserialization error naming the failing
    /// path.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> Result<T> {
        self.execute(url, config).await?.json()
    }

    /// `GET` with query parameters.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::execute`].
    pub async fn get<P: Serialize + ?Sized>(&self, url: &str, params: &P) -> Result<ResponseData> {
        let config = RequestConfig::new().method(Method::Get).params(params)?;
        self.execute(url, config).await
    }

    /// `POST` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::execute`].
    pub async fn post<D: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &D,
        config: RequestConfig,
    ) -> Result<ResponseData> {
        let config = config.method(Method::Post).data(data)?;
        self.execute(url, config).await
    }

    /// `POST` with a multipart body.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::execute`].
    pub async fn post_form(
        &self,
        url: &str,
        form: Form,
        config: RequestConfig,
    ) -> Result<ResponseData> {
        self.execute(url, config.method(Method::Post).form(form)).await
    }

    /// `PUT` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::execute`].
    pub async fn put<D: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &D,
        config: RequestConfig,
    ) -> Result<ResponseData> {
        let config = config.method(Method::Put).data(data)?;
        self.execute(url, config).await
    }

    /// `DELETE` with query parameters.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::execute`].
    pub async fn delete<P: Serialize + ?Sized>(
        &self,
        url: &str,
        params: &P,
    ) -> Result<ResponseData> {
        let config = RequestConfig::new().method(Method::Delete).params(params)?;
        self.execute(url, config).await
    }

    /// `GET` resolving to the raw payload, bytes untouched.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::execute`].
    pub async fn download<P: Serialize + ?Sized>(&self, url: &str, params: &P) -> Result<Blob> {
        let config = RequestConfig::new()
            .method(Method::Get)
            .params(params)?
            .blob();
        self.execute(url, config)
            .await?
            .into_blob()
            .ok_or_else(|| Error::decode("streamed response has no payload"))
    }

    async fn run(&self, config: FetchConfig) -> Result<ResponseData> {
        let start = Instant::now();
        let request_chain = self.request_chain();
        let response_chain = self.response_chain();

        let result = match request_chain.run(Ok(config)).await {
            Ok(mut config) => {
                let abort = config.take_abort_registration();
                let response_chain = &response_chain;
                let exchange = async move {
                    let outcome = self.send(config).await;
                    response_chain.run(outcome).await
                };
                match abort {
                    Some(registration) => Abortable::new(exchange, registration)
                        .await
                        .unwrap_or_else(|_| Err(Rejection::Error(Error::Superseded))),
                    None => exchange.await,
                }
            }
            Err(error) => Err(Rejection::Error(error)),
        };

        let result = match result {
            Ok(response) => response
                .into_data()
                .ok_or_else(|| Error::decode("response chain resolved without data")),
            Err(rejection) => Err(rejection.into_error().await),
        };

        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(data) => info!(kind = data.kind(), elapsed_ms, "request completed"),
            Err(error) if error.is_superseded() => debug!(elapsed_ms, "request superseded"),
            Err(error) => warn!(code = error.code(), error = %error, elapsed_ms, "request failed"),
        }
        result
    }

    async fn send(&self, config: FetchConfig) -> std::result::Result<FetchResponse, Rejection> {
        let request = config.to_request();
        let response = tokio::time::timeout(config.timeout(), self.inner.transport.execute(request))
            .await
            .map_err(|_| Error::Timeout)??;
        Ok(FetchResponse::new(config, response))
    }

    fn request_chain(&self) -> RequestInterceptors {
        let mut chain = lock(&self.inner.request_interceptors).clone();
        chain.add(register_pending(self.inner.pending.clone()));
        chain
    }

    fn response_chain(&self) -> ResponseInterceptors {
        let mut chain = ResponseInterceptors::new();
        chain.add(resolve_content());
        chain.extend(lock(&self.inner.response_interceptors).iter().cloned());
        chain.add(cleanup(self.inner.pending.clone()));
        chain
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Fixed stages
// ============================================================================

/// Default `cancel` to `true` and register the request for de-duplication.
fn register_pending(pending: PendingRequests) -> Interceptor<FetchConfig, Error> {
    Interceptor::new()
        .on_fulfilled(move |mut config: FetchConfig| {
            let pending = pending.clone();
            async move {
                if config.cancel().is_none() {
                    config.set_cancel(true);
                }
                if config.cancel() == Some(true) {
                    pending.add(&mut config);
                }
                Ok(config)
            }
        })
        .on_rejected(|error: Error| async move {
            Err(Error::interceptor(error.message().into_owned()))
        })
}

/// Reject non-success responses, then resolve the body as a stream, a raw blob or by
/// content type.
fn resolve_content() -> Interceptor<FetchResponse, Rejection> {
    Interceptor::fulfilled(|mut response: FetchResponse| async move {
        if !response.is_success() {
            return Err(Rejection::from(response));
        }

        let data = if response.config().on_stream().is_some() {
            handle_stream(&mut response).await?
        } else {
            let buffered = response.read_body().await?;
            if response.config().wants_blob() {
                ResponseData::blob_from_response(&buffered)
            } else {
                ResponseData::from_response(&buffered)?
            }
        };
        response.set_data(data);
        Ok(response)
    })
}

/// Release the pending registration and turn any rejection into an error.
fn cleanup(pending: PendingRequests) -> Interceptor<FetchResponse, Rejection> {
    let on_success = pending.clone();
    Interceptor::new()
        .on_fulfilled(move |mut response: FetchResponse| {
            on_success.remove(response.config_mut());
            async move { Ok(response) }
        })
        .on_rejected(move |rejection: Rejection| {
            let pending = pending.clone();
            async move {
                let rejection = match rejection {
                    Rejection::Status(mut response) => {
                        pending.remove(response.config_mut());
                        Rejection::Status(response)
                    }
                    error @ Rejection::Error(_) => error,
                };
                Err(Rejection::Error(rejection.into_error().await))
            }
        })
}
