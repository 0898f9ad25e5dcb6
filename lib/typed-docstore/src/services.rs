//! Collaborator traits for the remote services behind a connection.
//!
//! - `DocumentStore`: addressed get/set of schema-less documents
//! - `AuthService`: anonymous sign-in
//! - `BlobStorage`: address resolution only
//! - `Backend`: builds all three for a configuration
//!
//! Backends (in-memory, remote) implement these; the rest of the crate only
//! talks to them through a [`Connection`](crate::Connection).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{ClientConfig, Map, StoreResult, auto_id};

/// Address of a single document. Does not imply the document exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A raw document as fetched from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: String,
    pub data: Map,
}

/// Schema-less document store client.
///
/// Transport failures are reported as `StoreError::Transport` and are passed
/// through to callers untouched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the document at `path`. Returns `Ok(None)` if it does not exist.
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Map>>;

    /// Overwrite the document at `path`.
    async fn set(&self, path: &DocumentPath, data: Map) -> StoreResult<()>;

    /// Allocate an identifier for a not-yet-written document in `collection`.
    ///
    /// Must not perform I/O. The default draws from the store's auto-id space.
    fn new_id(&self, _collection: &str) -> String {
        auto_id()
    }

    /// Route all further calls to a local emulator.
    fn connect_emulator(&self, host: &str, port: u16);
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub is_anonymous: bool,
}

/// Result of a sign-in call. A transport-level success may still carry no user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserCredential {
    pub user: Option<User>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmulatorOptions {
    pub disable_warnings: bool,
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in_anonymously(&self) -> StoreResult<UserCredential>;

    /// Route all further calls to a local emulator at `url`.
    fn connect_emulator(&self, url: &str, options: EmulatorOptions);
}

/// Blob storage client. Exposed for address resolution only.
pub trait BlobStorage: Send + Sync {
    fn bucket(&self) -> Option<String>;

    /// Public address of the object at `path`.
    fn object_url(&self, path: &str) -> String;

    fn connect_emulator(&self, host: &str, port: u16);
}

/// The three sub-handles owned by a connection.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthService>,
    pub storage: Arc<dyn BlobStorage>,
}

/// Factory for service clients.
///
/// Initialization cannot fail: an unusable configuration surfaces on the
/// first call that actually reaches the service.
///
/// `initialize` runs while the connection registry's lock is held. It must not
/// call `get_connection`, `current_connection` or any other registry method,
/// or it deadlocks.
pub trait Backend: Send + Sync {
    fn initialize(&self, config: &ClientConfig) -> Services;
}
