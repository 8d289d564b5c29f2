//! Actor error types.

use durocache_storage::StorageError;
use thiserror::Error;

/// Result type for actor operations.
pub type ActorResult<T> = Result<T, ActorError>;

/// Errors surfaced by the actor and its runtime.
///
/// None of these stop an actor: the runtime logs them and moves on to the
/// next event.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("actor mailbox closed")]
    MailboxClosed,

    #[error("invalid configuration: {0}")]
    Config(String),
}
