//! HTTP API over the note store, using Axum.
//!
//! - GET /memories?search=q - list, optionally filtered
//! - POST /memories - add (rejects blank text)
//! - PATCH /memories/:id - partial update
//! - POST /memories/:id/toggle - flip the completion flag
//! - DELETE /memories/:id - delete (idempotent)
//! - GET /status - loading flag, count, whether a remote mirror is active

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::{MemoryError, MemoryResult};
use crate::local_storage::KeyValueStore;
use crate::models::{MemoryRecord, MemoryUpdate, NewMemory};
use crate::remote::MemoryTable;
use crate::store::NoteStore;
use crate::validation::{validate_memory_id, validate_memory_text, validate_search_query};

/// Server shutdown handle
static SHUTDOWN_TX: OnceLock<Mutex<Option<oneshot::Sender<()>>>> = OnceLock::new();

/// Store shared between request handlers
pub type SharedStore<S, T> = Arc<Mutex<NoteStore<S, T>>>;

struct AppState<S: KeyValueStore, T: MemoryTable> {
    store: SharedStore<S, T>,
}

impl<S: KeyValueStore, T: MemoryTable> Clone for AppState<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore, T: MemoryTable> AppState<S, T> {
    fn lock(&self) -> MutexGuard<'_, NoteStore<S, T>> {
        // A panic inside a handler cannot leave the collection half-mutated,
        // so a poisoned lock is still usable.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    search: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusResponse {
    loading: bool,
    count: usize,
    remote_enabled: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: &MemoryError) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn not_found(id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, &MemoryError::NotFound(format!("memory {}", id)))
}

// Route handlers

async fn list_memories<S, T>(
    State(state): State<AppState<S, T>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: KeyValueStore + 'static,
    T: MemoryTable,
{
    if let Err(e) = validate_search_query(&query.search) {
        return error_response(StatusCode::BAD_REQUEST, &e);
    }
    let memories: Vec<MemoryRecord> = {
        let store = state.lock();
        store.search(&query.search).into_iter().cloned().collect()
    };
    tracing::debug!("GET /memories search={:?} -> {}", query.search, memories.len());
    Json(memories).into_response()
}

async fn add_memory<S, T>(
    State(state): State<AppState<S, T>>,
    Json(new): Json<NewMemory>,
) -> Response
where
    S: KeyValueStore + 'static,
    T: MemoryTable,
{
    let checked = validate_memory_text(&new.text)
        .and_then(|_| new.id.as_deref().map(validate_memory_id).transpose());
    if let Err(e) = checked {
        tracing::warn!("Rejected new memory: {}", e);
        return error_response(StatusCode::BAD_REQUEST, &e);
    }

    let memory = state.lock().add(new);
    (StatusCode::CREATED, Json(memory)).into_response()
}

async fn update_memory<S, T>(
    State(state): State<AppState<S, T>>,
    Path(id): Path<String>,
    Json(update): Json<MemoryUpdate>,
) -> Response
where
    S: KeyValueStore + 'static,
    T: MemoryTable,
{
    if let Some(text) = &update.text {
        if let Err(e) = validate_memory_text(text) {
            return error_response(StatusCode::BAD_REQUEST, &e);
        }
    }

    let mut store = state.lock();
    if store.get(&id).is_none() {
        return not_found(&id);
    }
    store.update(&id, update);
    match store.get(&id) {
        Some(memory) => Json(memory.clone()).into_response(),
        None => not_found(&id),
    }
}

async fn toggle_memory<S, T>(
    State(state): State<AppState<S, T>>,
    Path(id): Path<String>,
) -> Response
where
    S: KeyValueStore + 'static,
    T: MemoryTable,
{
    let mut store = state.lock();
    let Some(completed) = store.get(&id).map(|m| m.completed) else {
        return not_found(&id);
    };
    store.update(&id, MemoryUpdate::completed(!completed));
    match store.get(&id) {
        Some(memory) => Json(memory.clone()).into_response(),
        None => not_found(&id),
    }
}

async fn delete_memory<S, T>(
    State(state): State<AppState<S, T>>,
    Path(id): Path<String>,
) -> StatusCode
where
    S: KeyValueStore + 'static,
    T: MemoryTable,
{
    state.lock().delete(&id);
    StatusCode::NO_CONTENT
}

async fn status<S, T>(State(state): State<AppState<S, T>>) -> Json<StatusResponse>
where
    S: KeyValueStore + 'static,
    T: MemoryTable,
{
    let store = state.lock();
    Json(StatusResponse {
        loading: store.is_loading(),
        count: store.len(),
        remote_enabled: store.has_mirror(),
    })
}

/// Create the API router
pub fn create_router<S, T>(store: SharedStore<S, T>) -> Router
where
    S: KeyValueStore + 'static,
    T: MemoryTable,
{
    let state = AppState { store };

    Router::new()
        .route("/memories", get(list_memories::<S, T>).post(add_memory::<S, T>))
        .route(
            "/memories/:id",
            axum::routing::patch(update_memory::<S, T>).delete(delete_memory::<S, T>),
        )
        .route("/memories/:id/toggle", post(toggle_memory::<S, T>))
        .route("/status", get(status::<S, T>))
        .with_state(state)
}

/// Start the API server. Returns once [`stop_server`] is called.
pub async fn start_server<S, T>(store: SharedStore<S, T>, port: u16) -> MemoryResult<()>
where
    S: KeyValueStore + 'static,
    T: MemoryTable,
{
    let router = create_router(store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    // Create shutdown channel
    let (tx, rx) = oneshot::channel::<()>();
    let slot = SHUTDOWN_TX.get_or_init(|| Mutex::new(None));
    if let Ok(mut guard) = slot.lock() {
        *guard = Some(tx);
    }

    tracing::info!("Starting memories server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MemoryError::Network(e.to_string()))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            rx.await.ok();
        })
        .await
        .map_err(|e| MemoryError::Network(e.to_string()))?;

    Ok(())
}

/// Stop the API server
pub fn stop_server() {
    if let Some(mutex) = SHUTDOWN_TX.get() {
        if let Ok(mut guard) = mutex.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(());
            }
        }
    }
}
