mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use telly_server::router;

use common::{harness, harness_with};

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with_auth(app, method, uri, body, None).await
}

async fn send_with_auth(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_is_public() {
    let h = harness_with(|c| c.api_key = Some("secret".to_string())).await;
    let app = router(h.state.clone());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["memory_enabled"], true);
}

#[tokio::test]
async fn test_bearer_token_guards_memory_routes() {
    let h = harness_with(|c| c.api_key = Some("secret".to_string())).await;
    let app = router(h.state.clone());
    let payload = json!({ "content": "guarded" });

    let (status, _) = send(&app, Method::POST, "/memories", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send_with_auth(&app, Method::POST, "/memories", Some(payload.clone()), Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        send_with_auth(&app, Method::POST, "/memories", Some(payload), Some("secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "guarded");
    assert_eq!(body["source"], "direct");
}

#[tokio::test]
async fn test_memory_round_trip_over_http() {
    let h = harness().await;
    let app = router(h.state.clone());

    let (status, created) = send(
        &app,
        Method::POST,
        "/memories",
        Some(json!({ "content": "the cat is named Miso", "tags": ["pets"], "priority": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, hits) = send(
        &app,
        Method::POST,
        "/memories/search",
        Some(json!({ "query": "cat named Miso", "top_k": 3, "tags": ["pets"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits[0]["memory"]["id"], id.as_str());

    let (status, _) = send(
        &app,
        Method::POST,
        "/memories/search",
        Some(json!({ "query": "cat", "tags_match_mode": "some" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, Method::DELETE, &format!("/memories/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &format!("/memories/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_capture_and_context() {
    let h = harness().await;
    let app = router(h.state.clone());

    let (status, captured) = send(
        &app,
        Method::POST,
        "/sessions/s1/memories",
        Some(json!({ "content": "prefers window seats" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(captured["memory_enabled"], true);
    let id = captured["memory"]["id"].as_str().unwrap().to_string();

    let mut last = Value::Null;
    for _ in 0..3 {
        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/sessions/s1/memories/{}/recall", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        last = body;
    }
    assert_eq!(last["promotion"], "inserted");

    let (status, _) = send(
        &app,
        Method::POST,
        "/sessions/s1/messages",
        Some(json!({ "role": "user", "content": "book me a flight" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, context) =
        send(&app, Method::GET, "/sessions/s1/context?query=window", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(context["short_term"][0]["content"], "prefers window seats");
    assert_eq!(context["entries"][0]["tier"], "short_term");
    assert_eq!(context["entries"][0]["memory"]["content"], "prefers window seats");
    assert!(context["rendered"]
        .as_str()
        .unwrap()
        .contains("user: book me a flight"));
}

#[tokio::test]
async fn test_episode_errors_map_to_statuses() {
    let h = harness().await;
    let app = router(h.state.clone());

    let (status, started) = send(
        &app,
        Method::POST,
        "/episodes",
        Some(json!({ "session_id": "s1", "title": "Support call" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "active");
    let id = started["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/episodes/{}/events", id),
        Some(json!({ "event_type": "note", "actor": "agent", "action": "noted", "impact_score": 2.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, metrics) = send(
        &app,
        Method::POST,
        &format!("/episodes/{}/close", id),
        Some(json!({ "outcome": "resolved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["outcome"], "resolved");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/episodes/{}/events", id),
        Some(json!({ "event_type": "note", "actor": "agent", "action": "late" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/episodes/{}", uuid::Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transcript_routes() {
    let h = harness().await;
    let app = router(h.state.clone());

    let (status, saved) = send(
        &app,
        Method::POST,
        "/transcripts",
        Some(json!({
            "url": "https://youtu.be/http",
            "title": "HTTP caching",
            "transcript": "etags and cache control headers",
            "action_plan": "add etags"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = saved["id"].as_str().unwrap().to_string();

    let (status, by_url) = send(
        &app,
        Method::GET,
        "/transcripts/by-url?url=https://youtu.be/http",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_url["id"], id.as_str());

    let (status, stats) = send(&app, Method::GET, "/transcripts/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);

    h.embedder.set_available(false);
    let (status, search) = send(
        &app,
        Method::POST,
        "/transcripts/search",
        Some(json!({ "query": "etags" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(search["mode"], "keyword");
    assert_eq!(search["hits"][0]["transcript"]["id"], id.as_str());
}
