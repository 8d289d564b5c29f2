//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised while encoding or decoding persisted values.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("compressed stream is invalid: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A write was rejected because the stored profile is newer than the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("version conflict for {id}: stored {stored} is newer than candidate {candidate}")]
pub struct ConflictError {
    pub id: String,
    pub stored: i64,
    pub candidate: i64,
}

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("invalid entity id {0:?}")]
    InvalidId(String),

    #[error("store lock poisoned: {0}")]
    Lock(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
