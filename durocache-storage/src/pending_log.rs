//! Durable journal of accepted writes that have not reached the backing store.
//!
//! Every accepted write becomes exactly one intent; intents are never merged or
//! reordered. Keys are timestamps that strictly increase for the lifetime of
//! the store, so key order is enqueue order.

use crate::codec;
use crate::error::StorageResult;
use crate::kv::DurableStore;
use durocache_types::{Clock, Profile, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Key prefix shared by all pending intents.
pub const PENDING_PREFIX: &str = "pending_";

/// Identifies one pending intent by its enqueue timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntentKey(pub Timestamp);

impl IntentKey {
    /// The key the intent is stored under. Zero padding keeps lexical order
    /// equal to numeric order.
    pub fn storage_key(&self) -> String {
        format!("{PENDING_PREFIX}{:020}", self.0)
    }

    /// Parses a storage key produced by [`IntentKey::storage_key`].
    pub fn parse(key: &str) -> Option<Self> {
        key.strip_prefix(PENDING_PREFIX)?.parse().ok().map(Self)
    }
}

impl fmt::Display for IntentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// A logged write awaiting sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingIntent {
    pub enqueued_at: Timestamp,
    pub profile: Profile,
}

impl PendingIntent {
    pub fn key(&self) -> IntentKey {
        IntentKey(self.enqueued_at)
    }
}

/// Append-only log of [`PendingIntent`]s.
pub struct PendingLog {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    last_key: Option<Timestamp>,
}

impl PendingLog {
    /// Opens the log, seeding the key counter from intents already stored.
    pub fn open(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let last_key = store
            .list_prefix(PENDING_PREFIX, None)?
            .last()
            .and_then(|(key, _)| IntentKey::parse(key))
            .map(|key| key.0);
        Ok(Self {
            store,
            clock,
            last_key,
        })
    }

    /// Journals `profile` and returns the key it was stored under.
    pub fn append(&mut self, profile: &Profile) -> StorageResult<IntentKey> {
        let now = self.clock.now_millis().max(0);
        let enqueued_at = match self.last_key {
            Some(last) if last >= now => last + 1,
            _ => now,
        };
        let intent = PendingIntent {
            enqueued_at,
            profile: profile.clone(),
        };
        let key = intent.key();
        self.store.put(&key.storage_key(), &codec::encode(&intent)?)?;
        self.last_key = Some(enqueued_at);
        debug!("queued {} for {}", key, profile.id);
        Ok(key)
    }

    /// Returns every intent, oldest first. Nothing is removed.
    pub fn drain_all(&self) -> StorageResult<Vec<PendingIntent>> {
        self.read(None)
    }

    /// Returns at most `limit` of the oldest intents. Nothing is removed.
    pub fn drain_batch(&self, limit: usize) -> StorageResult<Vec<PendingIntent>> {
        self.read(Some(limit))
    }

    /// Removes exactly the given intents. Returns how many were present.
    pub fn clear(&self, keys: &[IntentKey]) -> StorageResult<usize> {
        let keys: Vec<String> = keys.iter().map(IntentKey::storage_key).collect();
        self.store.delete_many(&keys)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn len(&self) -> StorageResult<usize> {
        self.store.count_prefix(PENDING_PREFIX)
    }

    fn read(&self, limit: Option<usize>) -> StorageResult<Vec<PendingIntent>> {
        let entries = self.store.list_prefix(PENDING_PREFIX, limit)?;
        let mut intents = Vec::with_capacity(entries.len());
        for (key, bytes) in entries {
            match codec::decode::<PendingIntent>(&bytes) {
                Ok(intent) => intents.push(intent),
                Err(e) => {
                    // An unreadable intent can never be synced; keeping it
                    // would hold the alarm armed forever.
                    error!("discarding unreadable pending intent {key}: {e}");
                    self.store.delete(&key)?;
                }
            }
        }
        Ok(intents)
    }
}
