use thiserror::Error;

use crate::DecodeReport;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Malformed content: {collection}/{id}: {report}")]
    MalformedContent {
        collection: String,
        id: String,
        report: DecodeReport,
    },

    #[error("Logged in anonymously but no user in result")]
    MissingIdentity,

    #[error("Not a document: {0} must encode to a map")]
    NotADocument(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
