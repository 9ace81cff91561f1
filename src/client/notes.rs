//! Typed note and folder helpers on top of [`ResilientClient::run_resilient`].

use crate::client::core::{CallOptions, ResilientClient};
use crate::types::{Folder, FolderDraft, Note, NoteDraft, SearchHits};
use crate::{Error, ErrorContext, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

const DEFAULT_HITS_PER_PAGE: u32 = 10;

fn require(operation: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(
            format!("{} must not be empty", field),
            ErrorContext::new()
                .with_operation(operation)
                .with_source("client"),
        ));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(operation: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::from(e).with_context(ErrorContext::new().with_operation(operation)))
}

impl ResilientClient {
    pub async fn get_note(&self, id: &str) -> Result<Note> {
        require("get_note", "note id", id)?;
        let value = self.run_resilient("get_note", json!({ "id": id })).await?;
        decode("get_note", value)
    }

    /// Full-text search over notes. `hits_per_page` defaults to 10.
    pub async fn search_notes(&self, query: &str, hits_per_page: Option<u32>) -> Result<Vec<Note>> {
        require("search_notes", "query", query)?;
        let payload = json!({
            "query": query,
            "hits_per_page": hits_per_page.unwrap_or(DEFAULT_HITS_PER_PAGE),
        });
        let value = self.run_resilient("search_notes", payload).await?;
        decode::<SearchHits<Note>>("search_notes", value).map(|hits| hits.hits)
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let value = self.run_resilient("list_notes", json!({})).await?;
        decode::<SearchHits<Note>>("list_notes", value).map(|hits| hits.hits)
    }

    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        let value = self.run_resilient("list_folders", json!({})).await?;
        decode::<SearchHits<Folder>>("list_folders", value).map(|hits| hits.hits)
    }

    /// Folder whose title equals `name`, ignoring case.
    pub async fn find_folder(&self, name: &str) -> Result<Option<Folder>> {
        require("search_folder", "folder name", name)?;
        let value = self
            .run_resilient("search_folder", json!({ "name": name }))
            .await?;
        let hits: SearchHits<Folder> = decode("search_folder", value)?;
        let wanted = name.trim().to_lowercase();
        Ok(hits
            .into_iter()
            .find(|folder| folder.title.trim().to_lowercase() == wanted))
    }

    pub async fn create_note(&self, draft: &NoteDraft) -> Result<Note> {
        require("create_note", "title", &draft.title)?;
        let value = self
            .run_resilient("create_note", serde_json::to_value(draft)?)
            .await?;
        decode("create_note", value)
    }

    /// Replace the title and body of note `id`.
    pub async fn update_note(&self, id: &str, draft: &NoteDraft) -> Result<Note> {
        require("update_note", "note id", id)?;
        require("update_note", "title", &draft.title)?;
        let mut payload = serde_json::to_value(draft)?;
        if let Value::Object(map) = &mut payload {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }
        let value = self.run_resilient("update_note", payload).await?;
        decode("update_note", value)
    }

    /// Retitle note `id`, keeping its current body.
    pub async fn rename_note(&self, id: &str, title: &str) -> Result<Note> {
        require("rename_note", "note id", id)?;
        require("rename_note", "title", title)?;
        let current = self.fetch_fresh(id).await?;
        let draft = NoteDraft::new(title, current.body().unwrap_or_default());
        self.update_note(id, &draft).await
    }

    /// Add `markdown` after the current body of note `id`, separated by a blank
    /// line. The title is kept.
    pub async fn append_to_note(&self, id: &str, markdown: &str) -> Result<Note> {
        require("append_to_note", "note id", id)?;
        let current = self.fetch_fresh(id).await?;
        let body = match current.body().map(str::trim_end) {
            Some(existing) if !existing.is_empty() => format!("{}\n\n{}", existing, markdown),
            _ => markdown.to_string(),
        };
        self.update_note(id, &NoteDraft::new(current.title, body)).await
    }

    /// Current upstream state of a note, skipping the cache lookup so edits never
    /// build on a stale copy.
    async fn fetch_fresh(&self, id: &str) -> Result<Note> {
        let (value, _) = self
            .run_resilient_with_stats(
                "get_note",
                json!({ "id": id }),
                CallOptions::new().bypass_cache(),
            )
            .await?;
        decode("get_note", value)
    }

    pub async fn delete_note(&self, id: &str) -> Result<()> {
        require("delete_note", "note id", id)?;
        self.run_resilient("delete_note", json!({ "id": id }))
            .await
            .map(|_| ())
    }

    pub async fn create_folder(&self, draft: &FolderDraft) -> Result<Folder> {
        require("create_folder", "title", &draft.title)?;
        let value = self
            .run_resilient("create_folder", serde_json::to_value(draft)?)
            .await?;
        decode("create_folder", value)
    }

    pub async fn rename_folder(&self, id: &str, title: &str) -> Result<Folder> {
        require("rename_folder", "folder id", id)?;
        require("rename_folder", "title", title)?;
        let value = self
            .run_resilient("rename_folder", json!({ "id": id, "title": title }))
            .await?;
        decode("rename_folder", value)
    }

    pub async fn delete_folder(&self, id: &str) -> Result<()> {
        require("delete_folder", "folder id", id)?;
        self.run_resilient("delete_folder", json!({ "id": id }))
            .await
            .map(|_| ())
    }
}
