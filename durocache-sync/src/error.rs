//! Sync error types.

use thiserror::Error;

/// Result type for backing-store operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// A batch could not be pushed to the backing store.
///
/// Every variant is treated as retryable; the scheduler keeps the batch in the
/// pending log and tries again on the next alarm.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("backing store rejected batch: {0}")]
    Rejected(String),

    #[error("injected failure on call {0}")]
    Injected(u64),
}
