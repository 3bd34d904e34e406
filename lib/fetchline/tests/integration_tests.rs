//! Integration tests for `Fetcher` over `HyperTransport` using wiremock.

use std::sync::{Arc, Mutex};

use assert2::{check, let_assert};
use fetchline::{
    Error, FetchDefaults, Fetcher, Form, HyperTransport, Method, RequestConfig, ResponseData,
};
use serde::{Deserialize, Serialize};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Chat {
    id: u64,
    title: String,
}

fn fetcher(server: &MockServer) -> Fetcher {
    Fetcher::new(FetchDefaults::builder().base_url(server.uri()).build())
}

#[tokio::test]
async fn test_get_with_params() {
    let mock_server = MockServer::start().await;

    let chats = vec![Chat {
        id: 1,
        title: "notes".to_string(),
    }];

    Mock::given(method("GET"))
        .and(path("/chat/list"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&chats))
        .mount(&mock_server)
        .await;

    let data = fetcher(&mock_server)
        .get("/chat/list", &serde_json::json!({"page": 2}))
        .await
        .expect("data");

    let body: Vec<Chat> = data.json().expect("chats");
    assert_eq!(body, chats);
}

#[tokio::test]
async fn test_post_json_body() {
    let mock_server = MockServer::start().await;

    let input = serde_json::json!({"title": "notes"});
    let output = Chat {
        id: 42,
        title: "notes".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/chat/new"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(&input))
        .respond_with(ResponseTemplate::new(201).set_body_json(&output))
        .expect(1)
        .mount(&mock_server)
        .await;

    let chat: Chat = fetcher(&mock_server)
        .execute_json(
            "/chat/new",
            RequestConfig::new()
                .method(Method::Post)
                .data(&input)
                .expect("data"),
        )
        .await
        .expect("chat");

    assert_eq!(chat, output);
}

#[tokio::test]
async fn test_put_and_delete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/chat/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("updated"))
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/chat/1"))
        .and(query_param("hard", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string("deleted"))
        .mount(&mock_server)
        .await;

    let fetcher = fetcher(&mock_server);

    let updated = fetcher
        .put("/chat/1", &serde_json::json!({"title": "x"}), RequestConfig::new())
        .await
        .expect("put");
    check!(updated.as_text() == Some("updated"));

    let deleted = fetcher
        .delete("/chat/1", &serde_json::json!({"hard": true}))
        .await
        .expect("delete");
    check!(deleted.as_text() == Some("deleted"));
}

#[tokio::test]
async fn test_custom_headers_merge_with_defaults() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/session"))
        .and(header("Content-Type", "application/json"))
        .and(header("X-Session", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    fetcher(&mock_server)
        .execute("/session", RequestConfig::new().header("X-Session", "abc"))
        .await
        .expect("data");
}

#[tokio::test]
async fn test_error_payload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({"code": 500, "message": "boom"})),
        )
        .mount(&mock_server)
        .await;

    let fetcher = fetcher(&mock_server);
    let_assert!(Err(error) = fetcher.execute("/broken", RequestConfig::new()).await);

    check!(error.code() == 500);
    check!(error.message() == "boom");
    check!(error.is_server_error());
    check!(fetcher.pending().is_empty());
}

#[tokio::test]
async fn test_error_payload_with_application_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/doc/1"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(serde_json::json!({"code": 10403, "message": "not your document"})),
        )
        .mount(&mock_server)
        .await;

    let_assert!(
        Err(error) = fetcher(&mock_server)
            .execute("/doc/1", RequestConfig::new())
            .await
    );
    check!(error.code() == 10403);
    check!(error.message() == "not your document");
}

#[tokio::test]
async fn test_not_found_without_payload() {
    let mock_server = MockServer::start().await;

    let_assert!(
        Err(error) = fetcher(&mock_server)
            .execute("/missing", RequestConfig::new())
            .await
    );
    check!(error.code() == 404);
    check!(error.is_client_error());
}

#[tokio::test]
async fn test_streaming_response() {
    let mock_server = MockServer::start().await;

    let events = "data: hello\n\ndata: wörld\n\n";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(events, "text/event-stream"))
        .mount(&mock_server)
        .await;

    let text = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&text);

    let data = fetcher(&mock_server)
        .execute(
            "/chat/completions",
            RequestConfig::new()
                .method(Method::Post)
                .data(&serde_json::json!({"prompt": "hi"}))
                .expect("data")
                .on_stream(move |_raw, chunk| sink.lock().expect("lock").push_str(chunk)),
        )
        .await
        .expect("completed");

    let_assert!(ResponseData::Stream(completion) = data);
    check!(completion.code == 700);
    check!(*text.lock().expect("lock") == events);
}

#[tokio::test]
async fn test_streaming_no_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/stop"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let result = fetcher(&mock_server)
        .execute(
            "/chat/stop",
            RequestConfig::new()
                .method(Method::Post)
                .on_stream(|_, _| {}),
        )
        .await;

    let_assert!(Err(Error::NoBody) = result);
}

#[tokio::test]
async fn test_image_download() {
    let mock_server = MockServer::start().await;

    let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A];
    Mock::given(method("GET"))
        .and(path("/avatar"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png.to_vec(), "image/png"))
        .mount(&mock_server)
        .await;

    let blob = fetcher(&mock_server)
        .download("/avatar", &serde_json::json!({}))
        .await
        .expect("blob");

    check!(blob.content_type() == "image/png");
    check!(blob.data().as_ref() == png);
}

#[tokio::test]
async fn test_document_download_is_binary_safe() {
    let mock_server = MockServer::start().await;

    let pdf: &[u8] = &[0x25, 0x50, 0x44, 0x46, 0xFF, 0xFE, 0x00, 0x80];
    Mock::given(method("GET"))
        .and(path("/documents/download"))
        .and(query_param("id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(pdf.to_vec(), "application/pdf"))
        .mount(&mock_server)
        .await;

    let blob = fetcher(&mock_server)
        .download("/documents/download", &serde_json::json!({"id": "7"}))
        .await
        .expect("blob");

    check!(blob.content_type() == "application/pdf");
    check!(blob.data().as_ref() == pdf);
}

#[tokio::test]
async fn test_multipart_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/doc/upload"))
        .and(header("Content-Type", "multipart/form-data; boundary=doc-upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 7})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let form = Form::with_boundary("doc-upload")
        .text("title", "notes")
        .file("file", "notes.txt", "hello");
    let data = fetcher(&mock_server)
        .post_form("/doc/upload", form, RequestConfig::new())
        .await
        .expect("data");

    check!(data.as_json() == Some(&serde_json::json!({"id": 7})));
}

#[tokio::test]
async fn test_connection_refused() {
    let fetcher = Fetcher::with_transport(
        HyperTransport::new(),
        FetchDefaults::builder().base_url("http://127.0.0.1:1").build(),
    );

    let_assert!(Err(error) = fetcher.execute("/x", RequestConfig::new()).await);
    check!(error.is_connection());
    check!(error.code() == 400);
    check!(fetcher.pending().is_empty());
}
