//! Durable key-value store with a single alarm slot.
//!
//! Each actor instance owns one store. Keys are UTF-8 strings, values are
//! opaque bytes, and listing by prefix always returns entries in ascending key
//! order. The alarm slot holds at most one wake-up time.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StorageResult;
use durocache_types::Timestamp;

/// A persistent map plus one schedulable alarm.
///
/// Implementations must be safe to share across threads; callers serialize
/// access per actor, so no cross-call transactions are required.
pub trait DurableStore: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Inserts or replaces the value under `key`.
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes `key`. Returns whether an entry existed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Removes every listed key. Returns how many entries existed.
    fn delete_many(&self, keys: &[String]) -> StorageResult<usize> {
        let mut removed = 0;
        for key in keys {
            if self.delete(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Lists entries whose key starts with `prefix`, in ascending key order,
    /// returning at most `limit` entries when given.
    fn list_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<(String, Vec<u8>)>>;

    /// Counts entries whose key starts with `prefix`.
    fn count_prefix(&self, prefix: &str) -> StorageResult<usize> {
        Ok(self.list_prefix(prefix, None)?.len())
    }

    /// Returns the pending alarm, if one is set.
    fn get_alarm(&self) -> StorageResult<Option<Timestamp>>;

    /// Sets the alarm, replacing any previous value.
    fn set_alarm(&self, at: Timestamp) -> StorageResult<()>;

    /// Clears the alarm.
    fn delete_alarm(&self) -> StorageResult<()>;
}
