//! Notes attached to an entity, listed and created under `{entity}/notes`.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{ListFilter, ListQuery, QueryParams, ValueRange};
use crate::types::{EntityType, WriteResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    pub id: u64,
    pub entity_id: u64,
    pub note_type: String,
    /// Shape depends on `note_type`.
    pub params: serde_json::Value,
    pub responsible_user_id: Option<u64>,
    pub group_id: Option<u64>,
    pub created_by: Option<u64>,
    pub updated_by: Option<u64>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub account_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub entity_id: u64,
    pub note_type: String,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl NewNote {
    /// Plain text note on `entity_id`.
    pub fn common(entity_id: u64, text: impl Into<String>) -> Self {
        Self {
            entity_id,
            note_type: "common".to_string(),
            params: serde_json::json!({ "text": text.into() }),
            request_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub entity_ids: Vec<u64>,
    pub note_types: Vec<String>,
    pub updated_at: Option<ValueRange<i64>>,
}

impl ListFilter for NoteFilter {
    fn write(&self, params: &mut QueryParams) {
        params.filter_list("entity_id", &self.entity_ids);
        params.filter_list("note_type", &self.note_types);
        if let Some(range) = &self.updated_at {
            params.filter_range("updated_at", range);
        }
    }
}

#[derive(Debug, Deserialize)]
struct NotesEmbedded<T> {
    #[serde(default = "Vec::new")]
    notes: Vec<T>,
}

fn notes_path(entity: EntityType) -> String {
    format!("{entity}/notes")
}

impl CrmClient {
    pub async fn list_notes(
        &self,
        entity: EntityType,
        query: &ListQuery,
        filter: &NoteFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Note>, ApiError> {
        let uri = self.list_uri(&notes_path(entity), query, filter)?;
        self.list_pages("list_notes", &uri, |e: NotesEmbedded<Note>| e.notes, cancel)
            .await
    }

    pub async fn create_notes(
        &self,
        entity: EntityType,
        notes: Option<&[NewNote]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "create_notes",
            HttpMethod::Post,
            &notes_path(entity),
            notes,
            |e: NotesEmbedded<WriteResult>| e.notes,
            cancel,
        )
        .await
    }
}
