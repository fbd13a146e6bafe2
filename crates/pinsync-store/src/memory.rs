use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use pinsync_types::{ContentId, ContentSet, PinStatus};

use crate::error::{StoreError, StoreResult};
use crate::stream::{self, ByteStream, DEFAULT_CHUNK_SIZE};
use crate::traits::ContentStore;

#[derive(Clone, Debug)]
struct Entry {
    status: PinStatus,
    data: Bytes,
}

/// In-memory, HashMap-based content store.
///
/// Intended for tests and dry runs. Entries carry a [`PinStatus`] so callers
/// can model pins that are still queued or have failed; only pinned entries
/// are listed.
pub struct InMemoryContentStore {
    name: String,
    chunk_size: usize,
    entries: RwLock<HashMap<ContentId, Entry>>,
}

impl InMemoryContentStore {
    /// Create a new empty store labelled `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Size of the chunks yielded by `export`.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Pin `data` under its derived identifier and return the identifier.
    pub fn insert(&self, data: impl Into<Bytes>) -> ContentId {
        let data = data.into();
        let id = ContentId::for_content(&data);
        self.insert_with_status(id.clone(), data, PinStatus::Pinned);
        id
    }

    /// Store `data` under `id` with an explicit pin status.
    pub fn insert_with_status(&self, id: ContentId, data: impl Into<Bytes>, status: PinStatus) {
        let entry = Entry {
            status,
            data: data.into(),
        };
        self.entries.write().expect("lock poisoned").insert(id, entry);
    }

    /// Content stored under `id`, whatever its status.
    pub fn get(&self, id: &ContentId) -> Option<Bytes> {
        let map = self.entries.read().expect("lock poisoned");
        map.get(id).map(|e| e.data.clone())
    }

    /// Pin status of `id`, if present.
    pub fn status(&self, id: &ContentId) -> Option<PinStatus> {
        let map = self.entries.read().expect("lock poisoned");
        map.get(id).map(|e| e.status)
    }

    /// Remove an entry. Returns `true` if it existed.
    pub fn remove(&self, id: &ContentId) -> bool {
        self.entries.write().expect("lock poisoned").remove(id).is_some()
    }

    /// Number of entries in any status.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Sorted identifiers of pinned entries.
    pub fn pinned_ids(&self) -> Vec<ContentId> {
        let map = self.entries.read().expect("lock poisoned");
        let mut ids: Vec<ContentId> = map
            .iter()
            .filter(|(_, e)| e.status.is_retained())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_pinned(&self) -> StoreResult<ContentSet> {
        Ok(self.pinned_ids().into_iter().collect())
    }

    async fn export(&self, id: &ContentId) -> StoreResult<ByteStream> {
        let data = self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(stream::from_bytes(data, self.chunk_size))
    }

    async fn import(&self, id: &ContentId, content: ByteStream) -> StoreResult<()> {
        let data = stream::collect(content).await?;
        tracing::trace!(store = %self.name, cid = %id, bytes = data.len(), "imported");
        self.insert_with_status(id.clone(), data, PinStatus::Pinned);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("name", &self.name)
            .field("entry_count", &self.len())
            .finish()
    }
}
