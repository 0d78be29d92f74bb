//! Error types for the memories core.
//!
//! Note that none of these errors ever escape `NoteStore::add`, `update` or
//! `delete`: persistence failures are logged there. They are returned by the
//! lower layers (local slot, remote table, config) and by the HTTP surface.

use thiserror::Error;

/// Result type alias for memories operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Main error type for memories operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Validation error in {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl MemoryError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MemoryError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new local storage error
    pub fn storage(message: impl Into<String>) -> Self {
        MemoryError::Storage(message.into())
    }
}

/// Postgres error code for "relation does not exist"
pub const RELATION_MISSING_CODE: &str = "42P01";

/// Failure reported by the remote `memories` table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote table has not been created yet.
    #[error("relation \"{table}\" does not exist")]
    RelationMissing { table: String },

    /// The remote answered with a non-success status.
    #[error("HTTP {status}: {message}{}", code_suffix(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never got an answer.
    #[error("network error: {0}")]
    Network(String),

    /// The answer could not be understood.
    #[error("invalid response: {0}")]
    Decode(String),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" (code {})", c))
        .unwrap_or_default()
}

impl RemoteError {
    /// Build an API error, promoting code `42P01` to `RelationMissing`.
    pub fn from_api(table: &str, status: u16, code: Option<String>, message: String) -> Self {
        if code.as_deref() == Some(RELATION_MISSING_CODE) {
            RemoteError::RelationMissing {
                table: table.to_string(),
            }
        } else {
            RemoteError::Api {
                status,
                code,
                message,
            }
        }
    }

    /// True for the "table does not exist" condition
    pub fn is_relation_missing(&self) -> bool {
        matches!(self, RemoteError::RelationMissing { .. })
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}
