//! Alarm-driven drain of the pending-write log.
//!
//! The scheduler owns the store's alarm slot. Whenever the log is non-empty an
//! alarm is armed; when it fires, the oldest intents are pushed to the
//! [`SyncTarget`] as one batch and cleared only if the push succeeded. Intents
//! appended while a push is in flight are never part of the cleared snapshot.
//!
//! ```text
//!   Idle ──ensure_armed──▶ Armed ──on_alarm──▶ Draining
//!    ▲                       ▲                    │
//!    └──── log empty ────────┼────────────────────┤
//!                            └─ failed / remaining┘
//! ```

use crate::config::SchedulerConfig;
use crate::target::SyncTarget;
use durocache_storage::{DurableStore, IntentKey, PendingLog, StorageResult};
use durocache_types::{Clock, Profile, Timestamp};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No alarm, nothing pending.
    Idle,
    /// Alarm set for `at`.
    Armed { at: Timestamp },
    /// Alarm fired, batch in flight.
    Draining,
}

/// Result of one alarm firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing was pending.
    Empty,
    /// The batch was accepted and cleared.
    Synced { count: usize, remaining: usize },
    /// The batch was rejected; every intent is still pending.
    Failed { pending: usize, retry_at: Timestamp },
}

/// Owns the alarm and drives drains against the backing store.
pub struct SyncScheduler {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    target: Arc<dyn SyncTarget>,
    config: SchedulerConfig,
    state: SchedulerState,
    consecutive_failures: u32,
}

impl SyncScheduler {
    /// Creates a scheduler, picking up any alarm left by a previous lifetime.
    pub fn new(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        target: Arc<dyn SyncTarget>,
        config: SchedulerConfig,
    ) -> StorageResult<Self> {
        let state = match store.get_alarm()? {
            Some(at) => SchedulerState::Armed { at },
            None => SchedulerState::Idle,
        };
        Ok(Self {
            store,
            clock,
            target,
            config,
            state,
            consecutive_failures: 0,
        })
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The alarm currently stored, if any.
    pub fn alarm(&self) -> StorageResult<Option<Timestamp>> {
        self.store.get_alarm()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Arms the alarm unless one is already set. Returns the wake time.
    ///
    /// Called after every append; an existing alarm is never moved, so a burst
    /// of writes shares one wake-up.
    pub fn ensure_armed(&mut self) -> StorageResult<Timestamp> {
        if let Some(at) = self.store.get_alarm()? {
            if self.state != SchedulerState::Draining {
                self.state = SchedulerState::Armed { at };
            }
            return Ok(at);
        }

        let at = self
            .clock
            .now_millis()
            .saturating_add(millis(self.config.sync_interval_ms));
        // Armed in memory even if the store write fails, so the running
        // instance still drains; a restart recovers from the intents.
        self.state = SchedulerState::Armed { at };
        self.store.set_alarm(at)?;
        debug!("sync alarm armed for {at}");
        Ok(at)
    }

    /// Handles a fired alarm: drains one batch and re-arms or goes idle.
    ///
    /// Backing-store failures are absorbed into [`DrainOutcome::Failed`]. A
    /// storage error still leaves an alarm armed so the drain is retried.
    pub async fn on_alarm(&mut self, log: &PendingLog) -> StorageResult<DrainOutcome> {
        self.state = SchedulerState::Draining;
        match self.drain(log).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("drain aborted by storage error: {e}");
                let at = self.next_attempt_at();
                if let Err(rearm) = self.store.set_alarm(at) {
                    error!("failed to re-arm sync alarm: {rearm}");
                }
                self.state = SchedulerState::Armed { at };
                Err(e)
            }
        }
    }

    /// Catch-up on startup: runs the alarm logic once if an alarm survived a
    /// restart, or if intents exist without one.
    pub async fn recover(&mut self, log: &PendingLog) -> StorageResult<Option<DrainOutcome>> {
        let alarm = self.store.get_alarm()?;
        let pending = log.len()?;
        if alarm.is_none() && pending == 0 {
            self.state = SchedulerState::Idle;
            return Ok(None);
        }

        info!("recovering sync state: alarm {alarm:?}, {pending} pending updates");
        self.on_alarm(log).await.map(Some)
    }

    async fn drain(&mut self, log: &PendingLog) -> StorageResult<DrainOutcome> {
        let batch = match self.config.max_batch_size {
            0 => log.drain_all()?,
            limit => log.drain_batch(limit)?,
        };

        if batch.is_empty() {
            self.store.delete_alarm()?;
            self.state = SchedulerState::Idle;
            self.consecutive_failures = 0;
            debug!("alarm fired with nothing pending");
            return Ok(DrainOutcome::Empty);
        }

        let keys: Vec<IntentKey> = batch.iter().map(|intent| intent.key()).collect();
        let profiles: Vec<Profile> = batch.into_iter().map(|intent| intent.profile).collect();
        info!("syncing {} pending updates", profiles.len());

        let synced = match self.target.sync_batch(&profiles).await {
            Ok(()) => {
                let cleared = log.clear(&keys)?;
                self.consecutive_failures = 0;
                info!("sync completed, cleared {cleared} updates");
                true
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    "sync of {} updates failed (attempt {}), retrying later: {e}",
                    keys.len(),
                    self.consecutive_failures
                );
                false
            }
        };

        let remaining = log.len()?;
        if remaining == 0 {
            self.store.delete_alarm()?;
            self.state = SchedulerState::Idle;
            return Ok(DrainOutcome::Synced {
                count: keys.len(),
                remaining,
            });
        }

        let at = self.next_attempt_at();
        self.store.set_alarm(at)?;
        self.state = SchedulerState::Armed { at };
        debug!("{remaining} updates still pending, next sync at {at}");

        Ok(if synced {
            DrainOutcome::Synced {
                count: keys.len(),
                remaining,
            }
        } else {
            DrainOutcome::Failed {
                pending: remaining,
                retry_at: at,
            }
        })
    }

    fn next_attempt_at(&self) -> Timestamp {
        let delay = self.config.retry_delay_ms(self.consecutive_failures);
        self.clock.now_millis().saturating_add(millis(delay))
    }
}

fn millis(delay_ms: u64) -> Timestamp {
    Timestamp::try_from(delay_ms).unwrap_or(Timestamp::MAX)
}
