//! HttpUpstream against a mockito server.

use ai_notes_rust::transport::{HttpUpstream, ServiceKind};
use ai_notes_rust::{ErrorKind, NoteDraft, ResilientClient, RetryPolicy, Upstream};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn notes_upstream(base_url: &str) -> HttpUpstream {
    HttpUpstream::new(
        ServiceKind::Notes,
        base_url,
        Some("sk-test".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_get_note_sends_bearer_auth() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/notes/n_42")
        .match_header("authorization", "Bearer sk-test")
        .match_header("x-request-id", Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "n_42", "title": "Weekly sync"}"#)
        .create_async()
        .await;

    let upstream = notes_upstream(&server.url());
    let value = upstream.call("get_note", &json!({"id": "n_42"})).await.unwrap();

    assert_eq!(value["title"], "Weekly sync");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_response_carries_retry_after() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v1/search-notes")
        .match_query(Matcher::UrlEncoded("type".into(), "folder".into()))
        .with_status(429)
        .with_header("retry-after", "3")
        .with_body(r#"{"error": {"code": "rate_limit_exceeded", "message": "too many requests"}}"#)
        .create_async()
        .await;

    let upstream = notes_upstream(&server.url());
    let failure = upstream.call("list_folders", &json!({})).await.unwrap_err();

    assert_eq!(failure.status, Some(429));
    assert_eq!(failure.code.as_deref(), Some("rate_limit_exceeded"));
    assert_eq!(failure.message, "too many requests");
    assert_eq!(failure.retry_after, Some(Duration::from_secs(3)));
    assert!(failure.request_id.is_some());
    assert_eq!(ErrorKind::classify(&failure), ErrorKind::RateLimited);
}

#[tokio::test]
async fn test_delete_with_no_content_returns_empty_object() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("DELETE", "/v1/notes/n_1")
        .with_status(204)
        .create_async()
        .await;

    let upstream = notes_upstream(&server.url());
    let value = upstream.call("delete_note", &json!({"id": "n_1"})).await.unwrap();
    assert_eq!(value, json!({}));
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    let upstream = notes_upstream("http://127.0.0.1:1");
    let failure = upstream.call("get_note", &json!({"id": "n_1"})).await.unwrap_err();

    assert_eq!(failure.status, None);
    assert_eq!(ErrorKind::classify(&failure), ErrorKind::Transient);
}

#[tokio::test]
async fn test_generate_uses_model_route_and_api_key_header() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
        .match_header("x-goog-api-key", "g-key")
        .match_body(Matcher::PartialJson(json!({"contents": [{"parts": [{"text": "hi"}]}]})))
        .with_status(200)
        .with_body(r#"{"candidates": []}"#)
        .create_async()
        .await;

    let upstream = HttpUpstream::new(
        ServiceKind::LanguageModel {
            model: "gemini-1.5-flash".to_string(),
        },
        &server.url(),
        Some("g-key".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();

    let value = upstream
        .call("generate", &json!({"contents": [{"parts": [{"text": "hi"}]}]}))
        .await
        .unwrap();
    assert_eq!(value, json!({"candidates": []}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_client_retries_server_errors_over_http() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/notes/n_9")
        .with_status(503)
        .with_body("upstream overloaded")
        .expect(2)
        .create_async()
        .await;

    let client = ResilientClient::builder()
        .upstream(Arc::new(notes_upstream(&server.url())))
        .retry_policy(
            RetryPolicy::default()
                .with_max_attempts(2)
                .with_base_delay(Duration::from_millis(10)),
        )
        .build()
        .unwrap();

    let err = client.get_note("n_9").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
    assert_eq!(err.context().and_then(|c| c.status_code), Some(503));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_note_posts_draft_and_decodes_note() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/notes")
        .match_body(Matcher::Json(
            json!({"title": "Retro", "markdown": "- ok", "parentNoteId": "f_1"}),
        ))
        .with_status(201)
        .with_body(r#"{"id": "n_100", "title": "Retro", "parentNoteId": "f_1"}"#)
        .create_async()
        .await;

    let client = ResilientClient::builder()
        .upstream(Arc::new(notes_upstream(&server.url())))
        .build()
        .unwrap();

    let note = client
        .create_note(&NoteDraft::new("Retro", "- ok").with_parent("f_1"))
        .await
        .unwrap();
    assert_eq!(note.id, "n_100");
    assert_eq!(note.parent_note_id.as_deref(), Some("f_1"));
    mock.assert_async().await;
}
