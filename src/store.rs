//! The note store.
//!
//! `NoteStore` owns the authoritative collection of memories. Every mutation:
//! 1. is applied to the in-memory collection (newest first on add)
//! 2. rewrites the whole collection to the local durable slot
//! 3. hands a copy to the remote mirror on a detached task
//!
//! Steps 2 and 3 never fail the caller. A failed local write is logged and
//! leaves memory and disk diverged until the next successful write; remote
//! outcomes are only logged.

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::MemoryResult;
use crate::local_storage::KeyValueStore;
use crate::models::{now_millis, MemoryRecord, MemoryUpdate, NewMemory};
use crate::remote::{MemoryTable, RemoteMirror};
use crate::search::filter_memories;

/// Decode a serialized collection.
pub fn decode_memories(data: &str) -> MemoryResult<Vec<MemoryRecord>> {
    Ok(serde_json::from_str(data)?)
}

/// Encode the collection for the local slot.
pub fn encode_memories(memories: &[MemoryRecord]) -> MemoryResult<String> {
    Ok(serde_json::to_string(memories)?)
}

pub struct NoteStore<S: KeyValueStore, T: MemoryTable> {
    slot: S,
    key: String,
    mirror: Option<RemoteMirror<T>>,
    memories: Vec<MemoryRecord>,
    loading: bool,
    last_generated_id: i64,
    pending: Vec<JoinHandle<()>>,
}

impl<S: KeyValueStore, T: MemoryTable> NoteStore<S, T> {
    /// Create an empty store in the loading state. Call [`NoteStore::load`]
    /// to read the persisted collection.
    pub fn new(slot: S, key: impl Into<String>, mirror: Option<RemoteMirror<T>>) -> Self {
        if mirror.is_none() {
            tracing::warn!("Remote mirror not available. Using local storage only.");
        }
        Self {
            slot,
            key: key.into(),
            mirror,
            memories: Vec::new(),
            loading: true,
            last_generated_id: 0,
            pending: Vec::new(),
        }
    }

    /// Create a store and load the persisted collection.
    pub fn open(slot: S, key: impl Into<String>, mirror: Option<RemoteMirror<T>>) -> Self {
        let mut store = Self::new(slot, key, mirror);
        store.load();
        store
    }

    /// Read the persisted collection, replacing the in-memory one.
    ///
    /// An absent slot yields an empty collection. So does an unreadable or
    /// undecodable one, after logging the failure.
    pub fn load(&mut self) {
        self.loading = true;
        let loaded = self
            .slot
            .get(&self.key)
            .and_then(|data| data.as_deref().map(decode_memories).transpose());

        self.memories = match loaded {
            Ok(Some(memories)) => {
                tracing::info!(count = memories.len(), "Loaded memories from local storage");
                memories
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!("Failed to load memories from local storage: {}", e);
                Vec::new()
            }
        };
        self.loading = false;
    }

    /// True until the initial read of the local slot has completed
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The whole collection, newest first
    pub fn memories(&self) -> &[MemoryRecord] {
        &self.memories
    }

    pub fn get(&self, id: &str) -> Option<&MemoryRecord> {
        self.memories.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// True when mutations are mirrored to a remote store
    pub fn has_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    /// Memories whose text contains `query`, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<&MemoryRecord> {
        filter_memories(&self.memories, query)
    }

    /// Add a memory at the front of the collection.
    ///
    /// Emptiness of `text` is the caller's concern.
    pub fn add(&mut self, new: NewMemory) -> MemoryRecord {
        let id = match new.id {
            Some(id) => id,
            None => self.generate_id(),
        };
        let memory = MemoryRecord {
            id,
            text: new.text,
            timestamp: new.timestamp.unwrap_or_else(now_millis),
            completed: new.completed.unwrap_or(false),
        };

        self.memories.insert(0, memory.clone());
        self.persist();
        tracing::debug!(id = %memory.id, "Added memory");

        if let Some(mirror) = self.mirror.clone() {
            let record = memory.clone();
            self.spawn_mirror(async move {
                mirror.upsert(&record).await;
            });
        }

        memory
    }

    /// Merge `update` into the memory with `id`, keeping its position.
    ///
    /// Unknown ids are ignored, both locally and remotely.
    pub fn update(&mut self, id: &str, update: MemoryUpdate) {
        let Some(memory) = self.memories.iter_mut().find(|m| m.id == id) else {
            tracing::debug!(id = %id, "Update for unknown memory ignored");
            return;
        };
        memory.merge(&update);
        self.persist();
        tracing::debug!(id = %id, "Updated memory");

        if let Some(mirror) = self.mirror.clone() {
            let id = id.to_string();
            self.spawn_mirror(async move {
                mirror.update(&id, &update).await;
            });
        }
    }

    /// Remove the memory with `id`. Deleting an unknown id is a no-op.
    pub fn delete(&mut self, id: &str) {
        let before = self.memories.len();
        self.memories.retain(|m| m.id != id);
        if self.memories.len() < before {
            tracing::debug!(id = %id, "Deleted memory");
        }
        self.persist();

        if let Some(mirror) = self.mirror.clone() {
            let id = id.to_string();
            self.spawn_mirror(async move {
                mirror.delete(&id).await;
            });
        }
    }

    /// Spawn the startup connection probe, if a mirror is configured.
    pub fn check_mirror_connection(&mut self) {
        if let Some(mirror) = self.mirror.clone() {
            self.spawn_mirror(async move {
                mirror.check_connection().await;
            });
        }
    }

    /// Wait for every mirror call issued so far.
    ///
    /// Never needed for correctness; used on shutdown and in tests.
    pub async fn flush_mirror(&mut self) {
        for handle in self.take_pending_mirrors() {
            if let Err(e) = handle.await {
                tracing::error!("Remote mirror task failed: {}", e);
            }
        }
    }

    /// Detach the outstanding mirror tasks, e.g. to await them without
    /// holding a lock on the store.
    pub fn take_pending_mirrors(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.pending)
    }

    /// Rewrite the whole collection to the local slot.
    fn persist(&self) {
        let result = encode_memories(&self.memories).and_then(|data| self.slot.set(&self.key, &data));
        if let Err(e) = result {
            tracing::error!("Failed to save memories to local storage: {}", e);
        }
    }

    fn spawn_mirror<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("No async runtime available, skipping remote mirror call");
            return;
        };
        self.pending.retain(|h| !h.is_finished());
        self.pending.push(handle.spawn(task));
    }

    /// Millisecond timestamp id, bumped past the previous one and past any
    /// id already in the collection so rapid adds never collide.
    fn generate_id(&mut self) -> String {
        let mut candidate = now_millis().max(self.last_generated_id + 1);
        while self.memories.iter().any(|m| m.id == candidate.to_string()) {
            candidate += 1;
        }
        self.last_generated_id = candidate;
        candidate.to_string()
    }
}
