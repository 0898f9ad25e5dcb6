//! In-memory blob storage. Only resolves addresses.

use parking_lot::RwLock;
use tracing::debug;
use typed_docstore::BlobStorage;

const PRODUCTION_ORIGIN: &str = "https://firebasestorage.googleapis.com";

#[derive(Default)]
pub struct MemoryBlobStorage {
    bucket: RwLock<Option<String>>,
    emulator: RwLock<Option<(String, u16)>>,
}

impl MemoryBlobStorage {
    pub fn new(bucket: Option<String>) -> Self {
        Self {
            bucket: RwLock::new(bucket),
            emulator: RwLock::new(None),
        }
    }

    pub fn set_bucket(&self, bucket: Option<String>) {
        *self.bucket.write() = bucket;
    }

    pub fn emulator(&self) -> Option<(String, u16)> {
        self.emulator.read().clone()
    }
}

impl BlobStorage for MemoryBlobStorage {
    fn bucket(&self) -> Option<String> {
        self.bucket.read().clone()
    }

    fn object_url(&self, path: &str) -> String {
        let origin = match self.emulator() {
            Some((host, port)) => format!("http://{}:{}", host, port),
            None => PRODUCTION_ORIGIN.to_string(),
        };
        let bucket = self.bucket().unwrap_or_default();
        format!(
            "{}/v0/b/{}/o/{}",
            origin,
            bucket,
            path.trim_start_matches('/').replace('/', "%2F")
        )
    }

    fn connect_emulator(&self, host: &str, port: u16) {
        debug!(host, port, "blob storage routed to emulator");
        *self.emulator.write() = Some((host.to_string(), port));
    }
}
