//! Error types for depot

use crate::validate::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("catalog entry not found: {0}")]
    EntryNotFound(u64),

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error("entry {0} has no preview image")]
    NoImage(u64),

    #[error("catalog entry {id} references missing blob {blob}")]
    MissingBlob { id: u64, blob: String },

    #[error("invalid storage name: {0}")]
    InvalidName(String),

    #[error("malformed upload request: {0}")]
    Multipart(String),

    #[error("upload exceeds the size limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("encoding error: {0}")]
    Encode(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}
