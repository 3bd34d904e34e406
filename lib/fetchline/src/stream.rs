//! Streaming response handling.

use fetchline_core::{ResponseData, Result, StreamCompletion, classify, code, decode_text};
use futures_util::StreamExt;
use tracing::debug;

use crate::FetchResponse;

/// Consume a response body as a text stream.
///
/// Calls the ready handler once with the response head, then the stream handler once
/// per chunk with the raw bytes and the text they completed. Resolves to the stream
/// completion value once the body ends.
///
/// # Errors
///
/// - code 701 if no stream handler is configured; the body is not touched
/// - code 702 if the response has no readable body
/// - any error raised while reading the body
pub async fn handle_stream(response: &mut FetchResponse) -> Result<ResponseData> {
    let Some(on_stream) = response.config().on_stream().cloned() else {
        return Err(classify(code::MISSING_STREAM_HANDLER, None));
    };
    let Some(body) = response.take_body() else {
        return Err(classify(code::NO_BODY, None));
    };

    if let Some(on_ready) = response.config().on_ready() {
        on_ready(response.head());
    }

    let mut chunks = decode_text(body);
    let mut count = 0_usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        on_stream(&chunk.raw, &chunk.text);
        count += 1;
    }

    if chunks.has_pending() {
        debug!(count, "stream ended inside a multi-byte sequence");
    } else {
        debug!(count, "stream completed");
    }
    Ok(ResponseData::Stream(StreamCompletion::default()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use assert2::{check, let_assert};
    use bytes::Bytes;
    use fetchline_core::{Error, StreamingBody, StreamingResponse};

    use super::*;
    use crate::{FetchConfig, FetchDefaults, RequestConfig};

    fn config(overrides: RequestConfig) -> FetchConfig {
        FetchConfig::resolve("https://example.com/chat", &FetchDefaults::default(), overrides)
            .expect("config")
    }

    fn chunked(chunks: &[&'static [u8]], polls: &Arc<AtomicUsize>) -> StreamingBody {
        let polls = Arc::clone(polls);
        let chunks: Vec<Bytes> = chunks.iter().copied().map(Bytes::from_static).collect();
        Box::pin(futures_util::stream::iter(chunks).map(move |chunk| {
            polls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(chunk)
        }))
    }

    #[tokio::test]
    async fn delivers_each_chunk_then_completes() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let ready = Arc::new(AtomicUsize::new(0));

        let sink = Arc::clone(&received);
        let ready_count = Arc::clone(&ready);
        let config = config(
            RequestConfig::new()
                .on_stream(move |raw, text| {
                    sink.lock().expect("lock").push((raw.clone(), text.to_string()));
                })
                .on_ready(move |head| {
                    assert_eq!(head.status(), 200);
                    ready_count.fetch_add(1, Ordering::SeqCst);
                }),
        );

        let polls = Arc::new(AtomicUsize::new(0));
        let body = chunked(&[b"ab", b"cd", b"ef"], &polls);
        let mut response =
            FetchResponse::new(config, StreamingResponse::new(200, HashMap::new(), body));

        let data = handle_stream(&mut response).await.expect("completed");
        let_assert!(ResponseData::Stream(completion) = data);
        check!(completion.code == 700);

        let received = received.lock().expect("lock");
        let texts: Vec<&str> = received.iter().map(|(_, text)| text.as_str()).collect();
        check!(texts == vec!["ab", "cd", "ef"]);
        check!(received.first().map(|(raw, _)| raw.as_ref()) == Some(&b"ab"[..]));
        check!(ready.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn missing_handler_rejects_before_reading() {
        let polls = Arc::new(AtomicUsize::new(0));
        let body = chunked(&[b"ab"], &polls);
        let mut response = FetchResponse::new(
            config(RequestConfig::new()),
            StreamingResponse::new(200, HashMap::new(), body),
        );

        let_assert!(Err(error) = handle_stream(&mut response).await);
        check!(error.code() == 701);
        let_assert!(Error::MissingStreamHandler = error);
        check!(polls.load(Ordering::SeqCst) == 0);
        check!(response.has_body());
    }

    #[tokio::test]
    async fn missing_body_rejects() {
        let mut response = FetchResponse::new(
            config(RequestConfig::new().on_stream(|_, _| {})),
            StreamingResponse::without_body(204, HashMap::new()),
        );

        let_assert!(Err(error) = handle_stream(&mut response).await);
        check!(error.code() == 702);
    }

    #[tokio::test]
    async fn split_character_is_delivered_once_complete() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let config = config(RequestConfig::new().on_stream(move |_, text| {
            sink.lock().expect("lock").push(text.to_string());
        }));

        // "é" split across two chunks
        let polls = Arc::new(AtomicUsize::new(0));
        let body = chunked(&[b"caf\xC3", b"\xA9!"], &polls);
        let mut response =
            FetchResponse::new(config, StreamingResponse::new(200, HashMap::new(), body));

        handle_stream(&mut response).await.expect("completed");
        check!(*received.lock().expect("lock") == vec!["caf".to_string(), "é!".to_string()]);
    }

    #[tokio::test]
    async fn read_error_is_propagated() {
        let body: StreamingBody = Box::pin(futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Err(Error::connection("reset by peer")),
        ]));
        let mut response = FetchResponse::new(
            config(RequestConfig::new().on_stream(|_, _| {})),
            StreamingResponse::new(200, HashMap::new(), body),
        );

        let_assert!(Err(error) = handle_stream(&mut response).await);
        check!(error.is_connection());
    }
}
