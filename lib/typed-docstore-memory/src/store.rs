//! In-memory document store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace};
use typed_docstore::{DocumentPath, DocumentStore, Map, StoreError, StoreResult};

/// HashMap-backed document store.
///
/// Documents are held behind a `RwLock` and cloned on read/write. The store
/// never interprets document contents.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<DocumentPath, Map>>,
    emulator: RwLock<Option<(String, u16)>>,
    emulator_connections: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` verbatim, bypassing converters. Useful for seeding
    /// documents a typed write could never produce.
    pub fn insert_raw(&self, collection: &str, id: &str, data: Map) {
        self.documents
            .write()
            .insert(DocumentPath::new(collection, id), data);
    }

    /// The stored document, exactly as written.
    pub fn raw(&self, collection: &str, id: &str) -> Option<Map> {
        self.documents
            .read()
            .get(&DocumentPath::new(collection, id))
            .cloned()
    }

    /// Sorted ids of every document in `collection`.
    pub fn ids(&self, collection: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .documents
            .read()
            .keys()
            .filter(|path| path.collection == collection)
            .map(|path| path.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    pub fn clear(&self) {
        self.documents.write().clear();
    }

    /// Simulate a transport outage: every call fails until cleared.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Emulator endpoint this store was routed to, if any.
    pub fn emulator(&self) -> Option<(String, u16)> {
        self.emulator.read().clone()
    }

    /// How many times `connect_emulator` has been called.
    pub fn emulator_connections(&self) -> usize {
        self.emulator_connections.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("document store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Map>> {
        self.check_online()?;
        trace!(%path, "get");
        Ok(self.documents.read().get(path).cloned())
    }

    async fn set(&self, path: &DocumentPath, data: Map) -> StoreResult<()> {
        self.check_online()?;
        trace!(%path, "set");
        self.documents.write().insert(path.clone(), data);
        Ok(())
    }

    fn connect_emulator(&self, host: &str, port: u16) {
        debug!(host, port, "document store routed to emulator");
        *self.emulator.write() = Some((host.to_string(), port));
        self.emulator_connections.fetch_add(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocumentStore")
            .field("document_count", &self.len())
            .field("emulator", &self.emulator())
            .finish()
    }
}
