//! Typed Docstore - validated, typed access to a schema-less document store.
//!
//! This crate sits between application code and a remote document store that
//! knows nothing about the shape of its documents. It binds stored documents
//! to domain types, rewrites temporal values before writes, and owns the
//! process-wide connection.
//!
//! # Core Concepts
//!
//! - **Connection**: one initialized set of service clients (document store,
//!   auth, blob storage) per process, optionally rerouted to local emulators.
//! - **Bound collection**: a named collection plus a decoder. Every read is
//!   decoded or rejected loudly; every write is normalized.
//! - **Normalization**: domain-native instants (`StorageDatetime`) become
//!   store-native `Timestamp`s anywhere in a document.
//!
//! # Entry Points
//!
//! - [`get_connection`]: the process-wide [`Connection`]
//! - [`Connection::bind`] / [`Connection::collection_of`]: typed collections
//! - [`Connection::doc_ref`]: untyped document references
//! - [`Connection::new_id`]: id allocation without writes
//! - [`Connection::sign_in_anonymously`]: anonymous identity

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

mod binder;
mod client;
mod config;
mod decode;
mod error;
mod identity;
mod ids;
mod normalize;
mod reference;
mod services;
mod time;
mod value;

pub use binder::{Collection, ValidatedConverter};
#[cfg(any(test, feature = "test-utils"))]
pub use client::{reset_connection, set_connection};
pub use client::{
    AUTH_EMULATOR_URL, ClientRegistry, Connection, FIRESTORE_EMULATOR_HOST,
    FIRESTORE_EMULATOR_PORT, STORAGE_EMULATOR_HOST, STORAGE_EMULATOR_PORT, current_connection,
    get_connection,
};
pub use config::{ClientConfig, USE_EMULATORS_ENV};
pub use decode::{
    DecodeIssue, DecodeReport, Decoder, Derived, FromValue, SerdeDecoder, ToValue, decode_field,
    derived, field_path, index_path,
};
pub use error::{StoreError, StoreResult};
pub use ids::{AUTO_ID_ALPHABET, AUTO_ID_LENGTH, auto_id};
pub use normalize::{normalize, normalize_with};
pub use reference::{CollectionRef, Converter, DocumentRef, PassthroughConverter};
pub use services::{
    AuthService, Backend, BlobStorage, DocumentPath, DocumentStore, EmulatorOptions, Services,
    Snapshot, User, UserCredential,
};
pub use time::{StorageDatetime, Timestamp};
pub use value::{Map, Value};

// Re-export derive macro
pub use typed_docstore_derive::Document;
