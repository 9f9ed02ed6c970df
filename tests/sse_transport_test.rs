//! SSE transport tests: endpoint discovery, message round trip, session cleanup

mod common;

use axum::{
    body::{Body, BodyDataStream},
    http::{Request, StatusCode},
    Router,
};
use common::create_test_server;
use learnbridge_core::transport::build_router;
use serde_json::{json, Value};
use std::time::Duration;
use tokio_stream::StreamExt;
use tower::ServiceExt;

async fn open_stream(router: &Router) -> BodyDataStream {
    let response = router
        .clone()
        .oneshot(Request::builder().uri("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    response.into_body().into_data_stream()
}

/// Read until a complete event with the given name arrives; returns its data
async fn next_event(stream: &mut BodyDataStream, name: &str) -> String {
    let mut buffer = String::new();
    let marker = format!("event: {}\n", name);
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let chunk = stream.next().await.unwrap().unwrap();
            buffer.push_str(std::str::from_utf8(&chunk).unwrap());
            if let Some(start) = buffer.find(&marker) {
                let rest = &buffer[start + marker.len()..];
                if let Some(end) = rest.find("\n\n") {
                    return rest[..end].trim_start_matches("data: ").to_string();
                }
            }
        }
    })
    .await
    .unwrap()
}

async fn post_message(router: &Router, uri: &str, body: &str) -> StatusCode {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn test_endpoint_event_then_message_round_trip() {
    let server = create_test_server();
    let router = build_router(server.dispatcher.clone());

    let mut stream = open_stream(&router).await;
    let endpoint = next_event(&mut stream, "endpoint").await;
    assert!(endpoint.starts_with("/messages/?session_id="));

    let status = post_message(
        &router,
        &endpoint,
        &json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let message: Value = serde_json::from_str(&next_event(&mut stream, "message").await).unwrap();
    assert_eq!(message["id"], 1);
    assert_eq!(message["result"]["protocolVersion"], "2024-11-05");

    let status = post_message(
        &router,
        &endpoint,
        &json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {"name": "session_info", "arguments": {}}
        })
        .to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let message: Value = serde_json::from_str(&next_event(&mut stream, "message").await).unwrap();
    let text = message["result"]["content"][0]["text"].as_str().unwrap();
    let info: Value = serde_json::from_str(text).unwrap();
    assert_eq!(info["session_management"]["active_sessions"], 1);
}

#[tokio::test]
async fn test_message_endpoint_rejections() {
    let server = create_test_server();
    let router = build_router(server.dispatcher.clone());
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();

    assert_eq!(
        post_message(&router, "/messages/", &ping).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        post_message(&router, "/messages/?session_id=does-not-exist", &ping).await,
        StatusCode::NOT_FOUND
    );

    let mut stream = open_stream(&router).await;
    let endpoint = next_event(&mut stream, "endpoint").await;
    assert_eq!(
        post_message(&router, &endpoint, "{broken").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_session_removed_when_client_disconnects() {
    let server = create_test_server();
    let router = build_router(server.dispatcher.clone());
    let sessions = server.dispatcher.context().sessions.clone();

    let mut stream = open_stream(&router).await;
    next_event(&mut stream, "endpoint").await;
    assert_eq!(sessions.summaries().await.len(), 1);

    drop(stream);

    let mut remaining = 1;
    for _ in 0..50 {
        remaining = sessions.summaries().await.len();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, 0);
}
