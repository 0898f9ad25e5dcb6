//! In-memory backend for typed-docstore.
//!
//! Implements the document store, auth and blob storage collaborators inside
//! the process. Serves as the local emulation backend and as the backend for
//! integration tests.
//!
//! # Example
//!
//! ```text
//! use typed_docstore::{ClientConfig, get_connection};
//! use typed_docstore_memory::MemoryBackend;
//!
//! let backend = MemoryBackend::new();
//! let conn = get_connection(&backend, &ClientConfig::new("demo").with_env());
//! let user = conn.sign_in_anonymously().await?;
//! ```

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

mod auth;
mod backend;
mod storage;
mod store;

pub use auth::MemoryAuth;
pub use backend::MemoryBackend;
pub use storage::MemoryBlobStorage;
pub use store::MemoryDocumentStore;

// Re-export core types for convenience
pub use typed_docstore::{
    Backend, ClientConfig, Connection, DocumentStore, Map, StoreError, StoreResult, Value,
};
