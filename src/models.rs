//! Data models for the memories core.
//!
//! `MemoryRecord` is the local, authoritative shape. `RemoteMemoryRow` and
//! `RemoteMemoryPatch` are the lossy projections written to the remote
//! `memories(id, title, content, created_at, is_favorite)` table; they are
//! never read back into the local model.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single user note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, immutable after creation
    pub id: String,
    /// User-entered content
    pub text: String,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    /// Completion flag toggled from the list view
    #[serde(default)]
    pub completed: bool,
}

impl MemoryRecord {
    /// Apply a partial update, field by field. Absent fields keep their value.
    pub fn merge(&mut self, update: &MemoryUpdate) {
        if let Some(text) = &update.text {
            self.text = text.clone();
        }
        if let Some(timestamp) = update.timestamp {
            self.timestamp = timestamp;
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
    }

    /// Remote upsert row for this record
    pub fn to_remote_row(&self) -> RemoteMemoryRow {
        RemoteMemoryRow {
            id: self.id.clone(),
            title: self.text.clone(),
            content: self.text.clone(),
            created_at: self.timestamp,
            is_favorite: false,
        }
    }
}

/// Input to `NoteStore::add`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMemory {
    pub text: String,
    /// Caller-supplied id, accepted verbatim
    #[serde(default)]
    pub id: Option<String>,
    /// Epoch milliseconds; defaults to now
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl NewMemory {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}

/// Partial fields for `NoteStore::update`.
///
/// `is_favorite` has no local counterpart and only reaches the remote mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUpdate {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
}

impl MemoryUpdate {
    /// Update that only sets the completion flag
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    /// Update that only replaces the text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Remote patch body for this update
    pub fn to_remote_patch(&self) -> RemoteMemoryPatch {
        RemoteMemoryPatch {
            title: self.text.clone(),
            content: self.text.clone(),
            is_favorite: self.is_favorite.unwrap_or(false),
        }
    }
}

/// Row written by the remote upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMemoryRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub is_favorite: bool,
}

/// Body of the remote update. Absent text leaves title/content untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMemoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub is_favorite: bool,
}

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MemoryRecord {
        MemoryRecord {
            id: "1700000000000".to_string(),
            text: "buy milk".to_string(),
            timestamp: 1_700_000_000_000,
            completed: false,
        }
    }

    #[test]
    fn test_merge_only_touches_present_fields() {
        let mut memory = record();
        memory.merge(&MemoryUpdate::completed(true));

        assert!(memory.completed);
        assert_eq!(memory.text, "buy milk");
        assert_eq!(memory.timestamp, 1_700_000_000_000);
        assert_eq!(memory.id, "1700000000000");
    }

    #[test]
    fn test_remote_row_mapping() {
        let row = record().to_remote_row();
        assert_eq!(row.title, "buy milk");
        assert_eq!(row.content, "buy milk");
        assert_eq!(row.created_at, 1_700_000_000_000);
        assert!(!row.is_favorite);
    }

    #[test]
    fn test_remote_patch_omits_missing_text() {
        let patch = MemoryUpdate::completed(true).to_remote_patch();
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "is_favorite": false }));
    }

    #[test]
    fn test_remote_patch_with_text_and_favorite() {
        let update = MemoryUpdate {
            text: Some("call mom".to_string()),
            is_favorite: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(update.to_remote_patch()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "title": "call mom", "content": "call mom", "is_favorite": true })
        );
    }

    #[test]
    fn test_record_decodes_without_completed_and_ignores_extra_fields() {
        let json = r#"{"id":"1","text":"x","timestamp":5,"is_favorite":true}"#;
        let memory: MemoryRecord = serde_json::from_str(json).unwrap();
        assert!(!memory.completed);
        assert_eq!(memory.timestamp, 5);
    }
}
