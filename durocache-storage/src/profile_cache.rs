//! Authoritative profile store for one actor instance.
//!
//! Reads never fail because of absence: a miss synthesizes and persists a stub.
//! Writes follow last-write-wins on the caller's timestamp, and an accepted
//! write is re-stamped with the apply time so later checks compare against the
//! order writes actually landed in.

use crate::codec;
use crate::error::{ConflictError, StorageError, StorageResult};
use crate::kv::DurableStore;
use crate::pending_log::PENDING_PREFIX;
use durocache_types::{Clock, Profile};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Rejects ids that cannot be stored under their own key.
pub fn validate_id(id: &str) -> StorageResult<()> {
    if id.is_empty() || id.starts_with(PENDING_PREFIX) {
        return Err(StorageError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Current-value cache for profiles, persisted through a [`DurableStore`].
pub struct ProfileCache {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the stored profile, creating and persisting a stub on a miss.
    pub fn get(&self, id: &str) -> StorageResult<Profile> {
        validate_id(id)?;
        if let Some(profile) = self.load(id)? {
            return Ok(profile);
        }

        let stub = Profile::stub(id, self.clock.now_millis());
        self.persist(&stub)?;
        info!("cache miss for {id}, created stub");
        Ok(stub)
    }

    /// Returns the stored profile without creating a stub.
    pub fn peek(&self, id: &str) -> StorageResult<Option<Profile>> {
        validate_id(id)?;
        self.load(id)
    }

    /// Applies `candidate` unless the stored profile is strictly newer.
    ///
    /// Returns the profile as persisted, whose `last_updated` is the apply
    /// time. A stale candidate yields [`StorageError::Conflict`] and leaves the
    /// store untouched.
    pub fn put(&self, candidate: &Profile) -> StorageResult<Profile> {
        let applied = self.prepare(candidate)?;
        self.commit(&applied)?;
        Ok(applied)
    }

    /// Runs the conflict check for `candidate` and returns it stamped with the
    /// apply time, without writing anything.
    ///
    /// Callers that must journal a write before it becomes visible pair this
    /// with [`ProfileCache::commit`].
    pub fn prepare(&self, candidate: &Profile) -> StorageResult<Profile> {
        validate_id(&candidate.id)?;
        if let Some(current) = self.load(&candidate.id)? {
            if current.last_updated > candidate.last_updated {
                info!(
                    "version conflict for {}: stored {} > candidate {}",
                    candidate.id, current.last_updated, candidate.last_updated
                );
                return Err(ConflictError {
                    id: candidate.id.clone(),
                    stored: current.last_updated,
                    candidate: candidate.last_updated,
                }
                .into());
            }
        }
        Ok(candidate.stamped(self.clock.now_millis()))
    }

    /// Persists a profile returned by [`ProfileCache::prepare`].
    pub fn commit(&self, applied: &Profile) -> StorageResult<()> {
        validate_id(&applied.id)?;
        self.persist(applied)?;
        debug!("applied update for {} at {}", applied.id, applied.last_updated);
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Option<Profile>> {
        let Some(bytes) = self.store.get(id)? else {
            return Ok(None);
        };
        match codec::decode::<Profile>(&bytes) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("stored profile for {id} is unreadable, treating as miss: {e}");
                Ok(None)
            }
        }
    }

    fn persist(&self, profile: &Profile) -> StorageResult<()> {
        let bytes = codec::encode(profile)?;
        self.store.put(&profile.id, &bytes)
    }
}
