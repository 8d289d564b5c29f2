//! Storage layer for durocache.
//!
//! Provides the per-actor persistence primitives:
//! - [`DurableStore`]: key-value map plus one alarm slot (memory or SQLite)
//! - [`codec`]: gzip-compressed JSON encoding for persisted values
//! - [`ProfileCache`]: current profile values with last-write-wins conflicts
//! - [`PendingLog`]: durable journal of writes awaiting sync
//!
//! # Persisted layout
//!
//! - `<entityId>` holds the encoded [`Profile`](durocache_types::Profile)
//! - `pending_<timestamp>` holds an encoded [`PendingIntent`]
//! - the alarm slot holds the next sync wake-up time

pub mod codec;
mod error;
pub mod kv;
mod pending_log;
mod profile_cache;

pub use error::{CodecError, ConflictError, StorageError, StorageResult};
pub use kv::{DurableStore, MemoryStore, SqliteStore};
pub use pending_log::{IntentKey, PENDING_PREFIX, PendingIntent, PendingLog};
pub use profile_cache::{ProfileCache, validate_id};
