//! Supervisor map from entity id to running actor.
//!
//! The registry is the only place actors are created. It opens the entity's
//! durable store, builds the actor, spawns its runtime and hands out cloneable
//! handles. Different entities share nothing but the backing-store target.

use crate::actor::ProfileActor;
use crate::config::{ActorConfig, StoreLocation};
use crate::error::ActorResult;
use crate::runtime::{ActorHandle, spawn_actor};
use durocache_storage::{DurableStore, MemoryStore, SqliteStore, StorageResult, validate_id};
use durocache_sync::SyncTarget;
use durocache_types::Clock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Opens the durable store for one entity.
pub trait StoreProvider: Send + Sync {
    fn open(&self, entity_id: &str) -> StorageResult<Arc<dyn DurableStore>>;
}

/// Keeps one [`MemoryStore`] per entity for the life of the provider, so an
/// actor respawned after shutdown sees its earlier state.
#[derive(Default)]
pub struct MemoryStoreProvider {
    stores: Mutex<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreProvider for MemoryStoreProvider {
    fn open(&self, entity_id: &str) -> StorageResult<Arc<dyn DurableStore>> {
        let mut stores = self
            .stores
            .lock()
            .map_err(|e| durocache_storage::StorageError::Lock(e.to_string()))?;
        let store = stores
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new()))
            .clone();
        Ok(store)
    }
}

/// One SQLite database per entity under a directory.
pub struct SqliteStoreProvider {
    dir: PathBuf,
}

impl SqliteStoreProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the database file backing `entity_id`.
    pub fn path_for(&self, entity_id: &str) -> PathBuf {
        self.dir.join(format!("{}.db", file_stem(entity_id)))
    }
}

impl StoreProvider for SqliteStoreProvider {
    fn open(&self, entity_id: &str) -> StorageResult<Arc<dyn DurableStore>> {
        Ok(Arc::new(SqliteStore::open(&self.path_for(entity_id))?))
    }
}

/// Escapes every byte outside `[A-Za-z0-9_-]` so distinct ids never share a
/// file name.
fn file_stem(entity_id: &str) -> String {
    let mut stem = String::with_capacity(entity_id.len());
    for byte in entity_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{byte:02x}"));
        }
    }
    stem
}

impl StoreLocation {
    /// Builds the provider for this location.
    pub fn provider(&self) -> Arc<dyn StoreProvider> {
        match self {
            StoreLocation::Memory => Arc::new(MemoryStoreProvider::new()),
            StoreLocation::Directory(dir) => Arc::new(SqliteStoreProvider::new(dir.clone())),
        }
    }
}

struct RegisteredActor {
    handle: ActorHandle,
    task: JoinHandle<()>,
}

/// Creates and owns one actor runtime per entity id.
pub struct ActorRegistry {
    actors: tokio::sync::Mutex<HashMap<String, RegisteredActor>>,
    provider: Arc<dyn StoreProvider>,
    target: Arc<dyn SyncTarget>,
    clock: Arc<dyn Clock>,
    config: ActorConfig,
}

impl ActorRegistry {
    pub fn new(
        provider: Arc<dyn StoreProvider>,
        target: Arc<dyn SyncTarget>,
        clock: Arc<dyn Clock>,
        config: ActorConfig,
    ) -> Self {
        Self {
            actors: tokio::sync::Mutex::new(HashMap::new()),
            provider,
            target,
            clock,
            config,
        }
    }

    /// Returns the running actor for `entity_id`, spawning it if needed.
    ///
    /// An actor whose runtime has stopped is replaced by a fresh one over the
    /// same store.
    pub async fn get_or_spawn(&self, entity_id: &str) -> ActorResult<ActorHandle> {
        validate_id(entity_id)?;
        let mut actors = self.actors.lock().await;
        if let Some(existing) = actors.get(entity_id) {
            if !existing.handle.is_closed() {
                return Ok(existing.handle.clone());
            }
            debug!("actor {entity_id} had stopped, respawning");
        }

        let store = self.provider.open(entity_id)?;
        let actor = ProfileActor::new(
            entity_id,
            store,
            self.clock.clone(),
            self.target.clone(),
            self.config.scheduler.clone(),
        )?;
        let (handle, task) = spawn_actor(actor, self.clock.clone(), self.config.mailbox_capacity);
        info!("spawned actor for {entity_id}");
        actors.insert(
            entity_id.to_string(),
            RegisteredActor {
                handle: handle.clone(),
                task,
            },
        );
        Ok(handle)
    }

    /// Returns the handle for a running actor without spawning.
    pub async fn get(&self, entity_id: &str) -> Option<ActorHandle> {
        let actors = self.actors.lock().await;
        actors
            .get(entity_id)
            .filter(|a| !a.handle.is_closed())
            .map(|a| a.handle.clone())
    }

    /// Number of registered actors, running or not yet reaped.
    pub async fn len(&self) -> usize {
        self.actors.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stops one actor and waits for its runtime to finish. Returns whether
    /// it was registered.
    pub async fn shutdown(&self, entity_id: &str) -> bool {
        let removed = self.actors.lock().await.remove(entity_id);
        match removed {
            Some(actor) => {
                stop(entity_id, actor).await;
                true
            }
            None => false,
        }
    }

    /// Stops every actor and waits for all runtimes to finish.
    pub async fn shutdown_all(&self) {
        let actors: Vec<(String, RegisteredActor)> =
            self.actors.lock().await.drain().collect();
        info!("shutting down {} actors", actors.len());
        futures::future::join_all(
            actors
                .into_iter()
                .map(|(entity_id, actor)| async move { stop(&entity_id, actor).await }),
        )
        .await;
    }
}

async fn stop(entity_id: &str, actor: RegisteredActor) {
    if actor.handle.shutdown().await.is_err() {
        debug!("actor {entity_id} already stopped");
    }
    if let Err(e) = actor.task.await {
        warn!("actor {entity_id} task ended abnormally: {e}");
    }
}
