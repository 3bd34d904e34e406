//! Integration tests for transport middleware.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use fetchline::middleware::{ConcurrencyLimitLayer, Layer, LoggingLayer};
use fetchline::{
    Error, FetchDefaults, Fetcher, HyperTransport, Request, RequestConfig, Result,
    ServiceFuture, StreamingResponse, Transport,
};
use tower::Service;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

/// Test that logging middleware doesn't break the request/response flow.
#[tokio::test]
async fn test_logging_middleware() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logged"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"logged": true})))
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::builder().with_logging().build();
    let url = url::Url::parse(&format!("{}/logged", mock_server.uri())).expect("url");
    let request = Request::builder(fetchline::Method::Get, url).build();

    let response = transport.execute(request).await.expect("response");
    assert!(response.is_success());

    let response = response.collect().await.expect("body");
    let body: serde_json::Value = response.json().expect("json");
    assert_eq!(body, serde_json::json!({"logged": true}));
}

#[tokio::test]
async fn test_debug_logging() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/debug"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let transport = HyperTransport::builder().with_debug_logging().build();
    let fetcher = Fetcher::with_transport(
        transport,
        FetchDefaults::builder().base_url(mock_server.uri()).build(),
    );

    let error = fetcher
        .post("/debug", &serde_json::json!({}), RequestConfig::new())
        .await
        .expect_err("server error");
    assert_eq!(error.code(), 500);
}

/// Counts the round-trips going through it.
#[derive(Clone)]
struct CountingLayer {
    count: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct Counting<S> {
    inner: S,
    count: Arc<AtomicUsize>,
}

impl<S> Layer<S> for CountingLayer {
    type Service = Counting<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Counting {
            inner,
            count: Arc::clone(&self.count),
        }
    }
}

impl<S> Service<Request> for Counting<S>
where
    S: Service<Request, Response = StreamingResponse, Error = Error, Future = ServiceFuture>,
{
    type Response = StreamingResponse;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.inner.call(request)
    }
}

#[tokio::test]
async fn test_generic_layer_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/counted"))
        .and(header("X-Trace", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let count = Arc::new(AtomicUsize::new(0));
    let transport = HyperTransport::builder()
        .layer(CountingLayer {
            count: Arc::clone(&count),
        })
        .layer(ConcurrencyLimitLayer::new(4))
        .layer(LoggingLayer::new())
        .build();
    let fetcher = Fetcher::with_transport(
        transport,
        FetchDefaults::builder()
            .base_url(mock_server.uri())
            .header("X-Trace", "1")
            .build(),
    );

    for _ in 0..2 {
        let data = fetcher
            .execute("/counted", RequestConfig::new())
            .await
            .expect("data");
        assert_eq!(data.as_text(), Some("ok"));
    }
    assert_eq!(count.load(Ordering::SeqCst), 2);
}
