use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;
use typed_docstore::{Backend, ClientConfig, Services};

use crate::{MemoryAuth, MemoryBlobStorage, MemoryDocumentStore};

/// Backend whose services live in this process.
///
/// Every initialization hands out the same store, auth and storage handles,
/// much like several clients pointed at one local emulator. The handles stay
/// reachable here so tests can inspect and seed them.
pub struct MemoryBackend {
    store: Arc<MemoryDocumentStore>,
    auth: Arc<MemoryAuth>,
    storage: Arc<MemoryBlobStorage>,
    initializations: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_auth(MemoryAuth::new())
    }

    pub fn with_auth(auth: MemoryAuth) -> Self {
        Self {
            store: Arc::new(MemoryDocumentStore::new()),
            auth: Arc::new(auth),
            storage: Arc::new(MemoryBlobStorage::default()),
            initializations: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<MemoryDocumentStore> {
        &self.store
    }

    pub fn auth(&self) -> &Arc<MemoryAuth> {
        &self.auth
    }

    pub fn storage(&self) -> &Arc<MemoryBlobStorage> {
        &self.storage
    }

    /// How many times `initialize` has run.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn initialize(&self, config: &ClientConfig) -> Services {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        debug!(project = %config.project_id, "initializing in-memory services");

        let bucket = config.storage_bucket.clone().or_else(|| {
            (!config.project_id.is_empty()).then(|| format!("{}.appspot.com", config.project_id))
        });
        self.storage.set_bucket(bucket);

        Services {
            store: self.store.clone(),
            auth: self.auth.clone(),
            storage: self.storage.clone(),
        }
    }
}
