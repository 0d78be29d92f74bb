//! memorycore - core of the "memories" note-taking application.
//!
//! This library provides:
//! - Data models (MemoryRecord and the remote row projections)
//! - The note store: local source of truth plus best-effort remote mirror
//! - Local durable key-value slots (SQLite, in-memory)
//! - The remote mirror client (Supabase / PostgREST)
//! - Search, validation and voice helpers for the presentation layer
//!
//! # Feature Flags
//!
//! - `server`: HTTP API (axum) and the `memories` binary.
//! - `desktop`: Platform config directory detection.

pub mod config;
pub mod error;
pub mod local_storage;
pub mod models;
pub mod remote;
pub mod search;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
pub mod validation;
pub mod voice;

// Re-export commonly used types
pub use config::{Config, RemoteConfig};
pub use error::{MemoryError, MemoryResult, RemoteError};
pub use local_storage::{InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore};
pub use models::{MemoryRecord, MemoryUpdate, NewMemory};
pub use remote::{MemoryTable, MirrorOutcome, RemoteMirror, SupabaseMirror, SupabaseTable};
pub use store::NoteStore;
