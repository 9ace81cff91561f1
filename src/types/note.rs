//! Note and folder payloads exchanged with the note service.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A note as returned by the note service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    /// Either a plain string or an object with a `markdown` field, depending on the endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Note {
    /// Markdown body, wherever the service put it.
    pub fn body(&self) -> Option<&str> {
        if let Some(md) = self.markdown.as_deref() {
            return Some(md);
        }
        match &self.content {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Object(map)) => map.get("markdown").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// A folder. The note service stores folders as notes with `type = folder`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_note_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Body of a `create_note` / `update_note` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub markdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_note_id: Option<String>,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            markdown: markdown.into(),
            parent_note_id: None,
        }
    }

    pub fn with_parent(mut self, parent_note_id: impl Into<String>) -> Self {
        self.parent_note_id = Some(parent_note_id.into());
        self
    }
}

/// Body of a `create_folder` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FolderDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            kind: "folder".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Search results. Accepts both `{"hits": [...]}` and a bare array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHits<T> {
    pub hits: Vec<T>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HitsShape<T> {
    Wrapped {
        #[serde(default = "Vec::new")]
        hits: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for SearchHits<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let hits = match HitsShape::deserialize(deserializer)? {
            HitsShape::Wrapped { hits } => hits,
            HitsShape::Bare(hits) => hits,
        };
        Ok(Self { hits })
    }
}

impl<T> SearchHits<T> {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl<T> IntoIterator for SearchHits<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_body_from_nested_content() {
        let note: Note = serde_json::from_value(json!({
            "id": "n_1",
            "title": "Weekly sync",
            "content": {"markdown": "# Agenda"},
            "updatedAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(note.body(), Some("# Agenda"));
        assert_eq!(note.updated_at.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[test]
    fn test_draft_uses_service_field_names() {
        let draft = NoteDraft::new("Retro", "- went well").with_parent("f_9");
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({"title": "Retro", "markdown": "- went well", "parentNoteId": "f_9"})
        );
        assert_eq!(
            serde_json::to_value(FolderDraft::new("Meetings")).unwrap(),
            json!({"title": "Meetings", "description": "", "type": "folder"})
        );
    }

    #[test]
    fn test_search_hits_accepts_both_shapes() {
        let wrapped: SearchHits<Folder> =
            serde_json::from_value(json!({"hits": [{"id": "f_1", "title": "Meetings"}]})).unwrap();
        assert_eq!(wrapped.len(), 1);

        let bare: SearchHits<Folder> =
            serde_json::from_value(json!([{"id": "f_1"}, {"id": "f_2"}])).unwrap();
        assert_eq!(bare.len(), 2);

        let empty: SearchHits<Folder> = serde_json::from_value(json!({})).unwrap();
        assert!(empty.is_empty());
    }
}
