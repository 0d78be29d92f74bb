//! Remote mirror client.
//!
//! The remote store is a PostgREST-style tabular API (Supabase) exposing a
//! `memories(id, title, content, created_at, is_favorite)` table. It is a
//! secondary, best-effort copy of the local collection:
//! - [`MemoryTable`] performs the raw calls and reports every failure
//! - [`RemoteMirror`] wraps a table, logs failures and never fails itself
//!
//! No call is retried. A missing table (Postgres code `42P01`) is logged as a
//! warning with a hint, everything else as an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::RemoteConfig;
use crate::error::{MemoryError, MemoryResult, RemoteError};
use crate::models::{MemoryRecord, MemoryUpdate, RemoteMemoryPatch, RemoteMemoryRow};

/// Name of the remote table
pub const MEMORIES_TABLE: &str = "memories";

const TABLE_MISSING_HINT: &str =
    "Memories table does not exist in the remote store. Please create it using the SQL provided in the setup instructions.";

/// Raw operations against the remote `memories` table.
pub trait MemoryTable: Send + Sync + 'static {
    /// Insert or replace the row with the same `id`.
    fn upsert(
        &self,
        row: &RemoteMemoryRow,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Patch the row with the given `id`.
    fn update(
        &self,
        id: &str,
        patch: &RemoteMemoryPatch,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Delete the row with the given `id` (absent rows are not an error).
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;

    /// Count rows, used as a connection probe. `None` if the remote did not
    /// report a total.
    fn count(&self) -> impl Future<Output = Result<Option<u64>, RemoteError>> + Send;
}

/// PostgREST error payload
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Build a `RemoteError` from a non-success status and its body.
fn error_from_body(status: u16, body: &str) -> RemoteError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => RemoteError::from_api(
            MEMORIES_TABLE,
            status,
            parsed.code,
            parsed.message.unwrap_or_else(|| body.to_string()),
        ),
        Err(_) => RemoteError::from_api(MEMORIES_TABLE, status, None, body.to_string()),
    }
}

/// Parse the total out of a `Content-Range` header (`0-9/42`, `*/0`).
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

/// Supabase / PostgREST implementation of [`MemoryTable`].
pub struct SupabaseTable {
    client: Client,
    base_url: String,
    key: String,
}

impl SupabaseTable {
    /// Create a client for the configured project
    pub fn new(config: RemoteConfig) -> MemoryResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MemoryError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            key: config.key,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, MEMORIES_TABLE)
    }

    fn row_url(&self, id: &str) -> String {
        format!("{}?id=eq.{}", self.table_url(), urlencoding::encode(id))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status.as_u16(), &body))
    }
}

impl MemoryTable for SupabaseTable {
    async fn upsert(&self, row: &RemoteMemoryRow) -> Result<(), RemoteError> {
        let request = self
            .client
            .post(format!("{}?on_conflict=id", self.table_url()))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row]);
        self.send(request).await?;
        Ok(())
    }

    async fn update(&self, id: &str, patch: &RemoteMemoryPatch) -> Result<(), RemoteError> {
        let request = self.client.patch(self.row_url(id)).json(patch);
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let request = self.client.delete(self.row_url(id));
        self.send(request).await?;
        Ok(())
    }

    async fn count(&self) -> Result<Option<u64>, RemoteError> {
        let request = self
            .client
            .get(format!("{}?select=id", self.table_url()))
            .header("Prefer", "count=exact")
            .header("Range", "0-0");
        let response = self.send(request).await?;
        Ok(response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range))
    }
}

/// What happened to a mirrored write. Informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    Ok,
    TableMissing,
    Failed(String),
}

/// Best-effort mirror over a [`MemoryTable`].
///
/// Every method resolves normally whatever the remote does.
pub struct RemoteMirror<T: MemoryTable> {
    table: Arc<T>,
}

impl<T: MemoryTable> Clone for RemoteMirror<T> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

/// Mirror backed by the Supabase REST API
pub type SupabaseMirror = RemoteMirror<SupabaseTable>;

impl SupabaseMirror {
    /// Build the mirror from the process environment.
    ///
    /// Decided once: `None` means every mutation stays local for the rest of
    /// the process.
    pub fn from_env() -> Option<Self> {
        let config = RemoteConfig::from_env()?;
        match SupabaseTable::new(config) {
            Ok(table) => Some(RemoteMirror::new(table)),
            Err(e) => {
                tracing::error!("Failed to create remote client: {}", e);
                None
            }
        }
    }
}

impl<T: MemoryTable> RemoteMirror<T> {
    pub fn new(table: T) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// The wrapped table
    pub fn table(&self) -> &T {
        &self.table
    }

    /// Mirror a newly added memory.
    pub async fn upsert(&self, memory: &MemoryRecord) -> MirrorOutcome {
        let result = self.table.upsert(&memory.to_remote_row()).await;
        report("saving", &memory.id, result)
    }

    /// Mirror an update of an existing memory.
    pub async fn update(&self, id: &str, update: &MemoryUpdate) -> MirrorOutcome {
        let result = self.table.update(id, &update.to_remote_patch()).await;
        report("updating", id, result)
    }

    /// Mirror a deletion.
    pub async fn delete(&self, id: &str) -> MirrorOutcome {
        let result = self.table.delete(id).await;
        report("deleting", id, result)
    }

    /// Probe the remote table once, logging what was found.
    pub async fn check_connection(&self) -> MirrorOutcome {
        match self.table.count().await {
            Ok(count) => {
                tracing::info!(rows = ?count, "Remote mirror connection OK");
                MirrorOutcome::Ok
            }
            Err(e) if e.is_relation_missing() => {
                tracing::warn!("{}", TABLE_MISSING_HINT);
                MirrorOutcome::TableMissing
            }
            Err(e) => {
                tracing::error!("Remote mirror connection test failed: {}", e);
                MirrorOutcome::Failed(e.to_string())
            }
        }
    }
}

fn report(action: &str, id: &str, result: Result<(), RemoteError>) -> MirrorOutcome {
    match result {
        Ok(()) => {
            tracing::debug!(id = %id, "Mirrored memory ({})", action);
            MirrorOutcome::Ok
        }
        Err(e) if e.is_relation_missing() => {
            tracing::warn!(id = %id, "{}", TABLE_MISSING_HINT);
            MirrorOutcome::TableMissing
        }
        Err(e) => {
            tracing::error!(id = %id, "Error {} memory in remote store: {}", action, e);
            MirrorOutcome::Failed(e.to_string())
        }
    }
}

/// Test doubles for the remote table.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RemoteCall {
        Upsert(RemoteMemoryRow),
        Update(String, RemoteMemoryPatch),
        Delete(String),
        Count,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Behavior {
        Succeed,
        NetworkError,
        RelationMissing,
    }

    /// Records every call, then answers according to `behavior`.
    pub struct RecordingTable {
        behavior: Behavior,
        calls: Arc<Mutex<Vec<RemoteCall>>>,
    }

    impl RecordingTable {
        pub fn new(behavior: Behavior) -> (Self, Arc<Mutex<Vec<RemoteCall>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    behavior,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }

        fn answer(&self, call: RemoteCall) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(call);
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::NetworkError => Err(RemoteError::Network("connection refused".to_string())),
                Behavior::RelationMissing => Err(RemoteError::RelationMissing {
                    table: MEMORIES_TABLE.to_string(),
                }),
            }
        }
    }

    impl MemoryTable for RecordingTable {
        async fn upsert(&self, row: &RemoteMemoryRow) -> Result<(), RemoteError> {
            self.answer(RemoteCall::Upsert(row.clone()))
        }

        async fn update(&self, id: &str, patch: &RemoteMemoryPatch) -> Result<(), RemoteError> {
            self.answer(RemoteCall::Update(id.to_string(), patch.clone()))
        }

        async fn delete(&self, id: &str) -> Result<(), RemoteError> {
            self.answer(RemoteCall::Delete(id.to_string()))
        }

        async fn count(&self) -> Result<Option<u64>, RemoteError> {
            self.answer(RemoteCall::Count).map(|_| Some(0))
        }
    }
}
