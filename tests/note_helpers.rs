//! Typed note/folder helpers on ResilientClient.

mod common;

use ai_notes_rust::{ErrorKind, FolderDraft, NoteDraft, ResilientClient};
use common::ScriptedUpstream;
use serde_json::json;
use std::sync::Arc;

fn client_with(upstream: &Arc<ScriptedUpstream>) -> ResilientClient {
    ResilientClient::builder()
        .upstream(upstream.clone())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_empty_ids_fail_before_any_call() {
    let upstream = Arc::new(ScriptedUpstream::new());
    let client = client_with(&upstream);

    let err = client.get_note("  ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(client.delete_note("").await.is_err());
    assert!(client.rename_folder("f_1", "").await.is_err());
    assert!(client.create_note(&NoteDraft::new("", "body")).await.is_err());
    assert!(client.search_notes("", None).await.is_err());
    assert_eq!(upstream.call_count(), 0);
}

#[tokio::test]
async fn test_get_note_decodes_nested_markdown() {
    let upstream = Arc::new(ScriptedUpstream::new().then_ok(json!({
        "id": "n_1",
        "title": "Planning",
        "content": {"markdown": "## Goals"}
    })));
    let client = client_with(&upstream);

    let note = client.get_note("n_1").await.unwrap();
    assert_eq!(note.title, "Planning");
    assert_eq!(note.body(), Some("## Goals"));

    // cached
    client.get_note("n_1").await.unwrap();
    assert_eq!(upstream.call_count(), 1);
}

#[tokio::test]
async fn test_search_notes_reads_hits() {
    let upstream = Arc::new(ScriptedUpstream::new().then_ok(json!({
        "hits": [{"id": "n_1", "title": "Standup"}, {"id": "n_2", "title": "Standup notes"}]
    })));
    let client = client_with(&upstream);

    let notes = client.search_notes("standup", Some(5)).await.unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].id, "n_2");
}

#[tokio::test]
async fn test_find_folder_matches_title_ignoring_case() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .then_ok(json!({"hits": [
                {"id": "f_1", "title": "Meeting Notes Archive"},
                {"id": "f_2", "title": "Meeting Notes"}
            ]}))
            .then_ok(json!({"hits": [{"id": "f_3", "title": "Drafts 2023"}]})),
    );
    let client = client_with(&upstream);

    let found = client.find_folder("meeting notes").await.unwrap();
    assert_eq!(found.map(|f| f.id).as_deref(), Some("f_2"));

    assert!(client.find_folder("Drafts").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_note_sends_id_with_draft() {
    let upstream = Arc::new(ScriptedUpstream::new());
    let client = client_with(&upstream);

    // The scripted upstream echoes the payload back
    let raw = client
        .run_resilient(
            "update_note",
            json!({"id": "n_5", "title": "t", "markdown": "m"}),
        )
        .await
        .unwrap();
    assert_eq!(raw["echo"]["id"], "n_5");

    let note = client
        .update_note("n_5", &NoteDraft::new("Weekly", "updated"))
        .await
        .unwrap();
    // Echo response has no note fields; decoding still succeeds with defaults
    assert!(note.id.is_empty());
    assert_eq!(upstream.operations(), vec!["update_note", "update_note"]);
}

#[tokio::test]
async fn test_create_folder_invalidates_folder_listing() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .then_ok(json!({"hits": []}))
            .then_ok(json!({"id": "f_9", "title": "Research"}))
            .then_ok(json!({"hits": [{"id": "f_9", "title": "Research"}]})),
    );
    let client = client_with(&upstream);

    assert!(client.list_folders().await.unwrap().is_empty());
    let folder = client
        .create_folder(&FolderDraft::new("Research").with_description("papers"))
        .await
        .unwrap();
    assert_eq!(folder.id, "f_9");

    let folders = client.list_folders().await.unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(upstream.call_count(), 3);
}

#[tokio::test]
async fn test_rename_note_keeps_body_and_invalidates_cache() {
    let old = json!({"id": "n_3", "title": "Sync", "content": {"markdown": "## Agenda"}});
    let renamed = json!({"id": "n_3", "title": "Weekly sync", "markdown": "## Agenda"});
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .then_ok(old.clone())
            .then_ok(old)
            .then_ok(renamed.clone())
            .then_ok(renamed),
    );
    let client = client_with(&upstream);

    assert_eq!(client.get_note("n_3").await.unwrap().title, "Sync");
    let note = client.rename_note("n_3", "Weekly sync").await.unwrap();
    assert_eq!(note.title, "Weekly sync");

    // the rename re-reads past the cache, then writes
    assert_eq!(
        upstream.operations(),
        vec!["get_note", "get_note", "update_note"]
    );
    assert_eq!(
        upstream.payloads()[2],
        json!({"id": "n_3", "title": "Weekly sync", "markdown": "## Agenda"})
    );

    assert_eq!(client.get_note("n_3").await.unwrap().title, "Weekly sync");
    assert_eq!(upstream.call_count(), 4);
}

#[tokio::test]
async fn test_append_to_note_joins_bodies_with_blank_line() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .then_ok(json!({"id": "n_4", "title": "Standup", "markdown": "- shipped cache\n"}))
            .then_ok(json!({"id": "n_4", "title": "Standup"})),
    );
    let client = client_with(&upstream);

    client.append_to_note("n_4", "- next: limiter").await.unwrap();

    assert_eq!(
        upstream.payloads()[1],
        json!({"id": "n_4", "title": "Standup", "markdown": "- shipped cache\n\n- next: limiter"})
    );
}

#[tokio::test]
async fn test_append_to_empty_note_uses_new_text_only() {
    let upstream = Arc::new(
        ScriptedUpstream::new()
            .then_ok(json!({"id": "n_5", "title": "Ideas"}))
            .then_ok(json!({"id": "n_5", "title": "Ideas"})),
    );
    let client = client_with(&upstream);

    client.append_to_note("n_5", "first idea").await.unwrap();
    assert_eq!(upstream.payloads()[1]["markdown"], "first idea");
    assert!(client.rename_note("n_5", " ").await.is_err());
    assert_eq!(upstream.call_count(), 2);
}
