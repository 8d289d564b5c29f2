//! Actor configuration.

use crate::error::{ActorError, ActorResult};
use durocache_sync::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by every actor spawned from a registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Sync interval, batch bound and backoff.
    pub scheduler: SchedulerConfig,

    /// Capacity of each actor's command mailbox.
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            mailbox_capacity: 256,
        }
    }
}

impl ActorConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> ActorResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ActorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ActorResult<()> {
        if self.mailbox_capacity == 0 {
            return Err(ActorError::Config("mailbox_capacity must be > 0".to_string()));
        }
        if self.scheduler.sync_interval_ms == 0 {
            return Err(ActorError::Config("sync_interval_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Where a registry keeps each actor's durable store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum StoreLocation {
    /// Process-lifetime stores.
    #[default]
    Memory,
    /// One SQLite file per entity under this directory.
    Directory(PathBuf),
}

