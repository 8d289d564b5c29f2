//! In-memory store, for tests and ephemeral actors.

use super::DurableStore;
use crate::error::{StorageError, StorageResult};
use durocache_types::Timestamp;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Vec<u8>>,
    alarm: Option<Timestamp>,
}

/// A [`DurableStore`] that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.lock()?.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        Ok(self.lock()?.entries.remove(key).is_some())
    }

    fn list_prefix(
        &self,
        prefix: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let inner = self.lock()?;
        let matching = inner
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()));
        Ok(match limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    fn get_alarm(&self) -> StorageResult<Option<Timestamp>> {
        Ok(self.lock()?.alarm)
    }

    fn set_alarm(&self, at: Timestamp) -> StorageResult<()> {
        self.lock()?.alarm = Some(at);
        Ok(())
    }

    fn delete_alarm(&self) -> StorageResult<()> {
        self.lock()?.alarm = None;
        Ok(())
    }
}
