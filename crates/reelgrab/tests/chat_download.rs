mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, RawQuery};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use reelgrab_engine::{ChatFetcher, PageResolver, create_client};
use serde_json::json;

use common::{TestServer, fast_config};

fn chat_fetcher(server: &TestServer) -> ChatFetcher {
    let config = fast_config();
    ChatFetcher::new(create_client(&config).unwrap(), &config)
        .with_base_url(server.base_url().as_str())
}

#[tokio::test]
async fn reads_chat_from_event_api_with_access_code() {
    let router = Router::new().route(
        "/api/event/{id}",
        get(
            |Path(id): Path<String>, Query(query): Query<HashMap<String, String>>| async move {
                if id != "ev42" || query.get("key").map(String::as_str) != Some("s3cret") {
                    return StatusCode::FORBIDDEN.into_response();
                }
                Json(json!({
                    "title": "Talk",
                    "chat": [
                        { "time": "10:00:01", "username": "alice", "text": "hello", "uid": 1 },
                        { "time": "10:00:02", "username": "bob", "text": "" },
                        { "time": "10:00:03", "name": "carol", "message": "question" },
                    ],
                }))
                .into_response()
            },
        ),
    );
    let server = TestServer::new(router).await;

    let messages = chat_fetcher(&server).fetch("ev42", Some("s3cret")).await;

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].username, "alice");
    assert_eq!(messages[0].user_id.as_deref(), Some("1"));
    assert_eq!(messages[1].username, "carol");
    assert_eq!(messages[1].message, "question");
}

#[tokio::test]
async fn falls_back_to_embedded_chat_page() {
    let api_hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&api_hits);
    let router = Router::new()
        .route(
            "/api/event/{id}",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NOT_FOUND
                }
            }),
        )
        .route(
            "/w/chat.html",
            get(|RawQuery(query): RawQuery| async move {
                if query.as_deref() != Some("ev42&key=abc") {
                    return String::from("<html></html>");
                }
                String::from(
                    r#"<html><script>
                    var chatData = [{"timestamp": "09:59:00", "author": "dave", "content": "first!"}];
                    </script></html>"#,
                )
            }),
        );
    let server = TestServer::new(router).await;

    let messages = chat_fetcher(&server).fetch("ev42", Some("abc")).await;

    assert_eq!(api_hits.load(Ordering::SeqCst), 1);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].timestamp, "09:59:00");
    assert_eq!(messages[0].username, "dave");
    assert_eq!(messages[0].message, "first!");
}

#[tokio::test]
async fn unavailable_chat_is_empty() {
    let server = TestServer::new(Router::new()).await;
    assert!(chat_fetcher(&server).fetch("gone", None).await.is_empty());
}

#[tokio::test]
async fn resolver_reports_event_id_for_chat() {
    let page = r#"<html><head><script>
        var TEMPLATE_EVENT_DATA = JSON.parse('{\"id\":\"ev42\"}');
        var GET_SERVERS = JSON.parse('[{\"src\":\"cdn.example\",\"cdn\":1}]');
    </script></head></html>"#;
    let router = Router::new().route("/w/{id}", get(move || async move { page }));
    let server = TestServer::new(router).await;

    let config = fast_config();
    let page = PageResolver::new(create_client(&config).unwrap(), &config)
        .with_base_url(server.base_url().as_str())
        .inspect("abc")
        .await
        .unwrap();

    assert_eq!(page.event_id.as_deref(), Some("ev42"));
    assert_eq!(
        page.stream_url.as_deref(),
        Some("https://cdn.example/public/ev42.m3u8")
    );
}
