//! The per-entity actor façade.
//!
//! `ProfileActor` turns session events into cache and log operations and
//! accepted writes into broadcasts. It assumes serialized access: the runtime
//! in [`crate::runtime`] feeds it one event at a time.

use crate::error::{ActorError, ActorResult};
use crate::protocol::{ClientMessage, ServerMessage, parse_client_message};
use crate::session::Session;
use durocache_storage::{ConflictError, DurableStore, PendingLog, ProfileCache, StorageError};
use durocache_sync::{DrainOutcome, SchedulerConfig, SchedulerState, SyncScheduler, SyncTarget};
use durocache_types::{Clock, Profile, SessionId, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of applying a candidate profile.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// Stored, journaled and broadcast.
    Applied(Profile),
    /// Rejected as stale; nothing changed.
    Conflict(ConflictError),
}

/// Point-in-time view of an actor, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorStats {
    pub entity_id: String,
    pub sessions: usize,
    pub pending: usize,
    pub alarm: Option<Timestamp>,
    pub state: SchedulerState,
}

/// Authoritative cache actor for one entity key.
pub struct ProfileActor {
    entity_id: String,
    cache: ProfileCache,
    log: PendingLog,
    scheduler: SyncScheduler,
    sessions: HashMap<SessionId, Session>,
}

impl ProfileActor {
    pub fn new(
        entity_id: impl Into<String>,
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn Clock>,
        target: Arc<dyn SyncTarget>,
        config: SchedulerConfig,
    ) -> ActorResult<Self> {
        let cache = ProfileCache::new(store.clone(), clock.clone());
        let log = PendingLog::open(store.clone(), clock.clone())?;
        let scheduler = SyncScheduler::new(store, clock, target, config)?;
        Ok(Self {
            entity_id: entity_id.into(),
            cache,
            log,
            scheduler,
            sessions: HashMap::new(),
        })
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Startup catch-up. Must run before the first connection or message so
    /// intents stranded by a crash are drained before anyone reads.
    pub async fn on_init(&mut self) -> ActorResult<Option<DrainOutcome>> {
        let outcome = self.scheduler.recover(&self.log).await?;
        info!("actor {} ready", self.entity_id);
        Ok(outcome)
    }

    /// Registers `session` and sends it the current profile for its subject.
    pub fn on_connect(&mut self, session: Session) -> ActorResult<()> {
        debug!("session {} connected to {}", session.id, self.entity_id);
        let id = session.id;
        let subject = session.subject_id.clone();
        self.sessions.insert(id, session);

        match self.cache.get(&subject) {
            Ok(profile) => self.send(id, &ServerMessage::Profile { data: profile }),
            Err(StorageError::InvalidId(subject)) => {
                warn!("session {id} connected with invalid subject {subject:?}");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Forgets a session. Returns whether it was connected.
    pub fn on_disconnect(&mut self, session_id: SessionId) -> bool {
        debug!("session {session_id} disconnected from {}", self.entity_id);
        self.sessions.remove(&session_id).is_some()
    }

    /// Handles one raw frame from `from`.
    ///
    /// Malformed and unrecognized frames are logged and dropped; only storage
    /// failures are returned.
    pub fn on_message(&mut self, from: SessionId, raw: &str) -> ActorResult<()> {
        let message = match parse_client_message(raw) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!("ignoring unrecognized message from {from}");
                return Ok(());
            }
            Err(e) => {
                warn!("dropping malformed message from {from}: {e}");
                return Ok(());
            }
        };

        match message {
            ClientMessage::GetProfile { user_id } => match self.cache.get(&user_id) {
                Ok(profile) => self.send(from, &ServerMessage::Profile { data: profile }),
                Err(StorageError::InvalidId(id)) => {
                    warn!("dropping get_profile from {from} for invalid id {id:?}");
                }
                Err(e) => return Err(e.into()),
            },
            ClientMessage::UpdateProfile { profile } => match self.apply_update(&profile) {
                Ok(UpdateOutcome::Applied(_)) => {}
                Ok(UpdateOutcome::Conflict(conflict)) => {
                    self.send(from, &ServerMessage::Conflict { id: conflict.id });
                }
                Err(ActorError::Storage(StorageError::InvalidId(id))) => {
                    warn!("dropping update_profile from {from} for invalid id {id:?}");
                }
                Err(e) => return Err(e),
            },
        }
        Ok(())
    }

    /// Applies a candidate write: journal, cache, alarm, broadcast.
    ///
    /// The intent is journaled before the cache changes, so an error leaves
    /// neither a cached value without an intent nor an intent without a
    /// cached value. A conflict touches nothing and broadcasts nothing.
    pub fn apply_update(&mut self, candidate: &Profile) -> ActorResult<UpdateOutcome> {
        let applied = match self.cache.prepare(candidate) {
            Ok(applied) => applied,
            Err(StorageError::Conflict(conflict)) => return Ok(UpdateOutcome::Conflict(conflict)),
            Err(e) => return Err(e.into()),
        };

        let key = self.log.append(&applied)?;
        if let Err(e) = self.cache.commit(&applied) {
            if let Err(undo) = self.log.clear(&[key]) {
                error!("failed to withdraw {key} after cache write failed: {undo}");
            }
            return Err(e.into());
        }

        // The write is durable at this point. An alarm that could not be
        // persisted is still armed in memory and recovered on restart.
        if let Err(e) = self.scheduler.ensure_armed() {
            error!("failed to persist sync alarm for {}: {e}", self.entity_id);
        }
        self.broadcast(&ServerMessage::ProfileUpdated {
            profile: applied.clone(),
        });
        Ok(UpdateOutcome::Applied(applied))
    }

    /// Reads a profile, creating the stub on a miss.
    pub fn get_profile(&self, id: &str) -> ActorResult<Profile> {
        Ok(self.cache.get(id)?)
    }

    /// Fired alarm: delegates to the scheduler.
    pub async fn on_alarm(&mut self) -> ActorResult<DrainOutcome> {
        Ok(self.scheduler.on_alarm(&self.log).await?)
    }

    /// When the runtime should next call [`ProfileActor::on_alarm`].
    pub fn next_alarm(&self) -> Option<Timestamp> {
        match self.scheduler.state() {
            SchedulerState::Armed { at } => Some(at),
            SchedulerState::Idle | SchedulerState::Draining => None,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn stats(&self) -> ActorResult<ActorStats> {
        Ok(ActorStats {
            entity_id: self.entity_id.clone(),
            sessions: self.sessions.len(),
            pending: self.log.len()?,
            alarm: self.scheduler.alarm()?,
            state: self.scheduler.state(),
        })
    }

    fn send(&mut self, to: SessionId, message: &ServerMessage) {
        let Some(frame) = render(message) else {
            return;
        };
        let delivered = match self.sessions.get(&to) {
            Some(session) => session.send(frame),
            None => {
                debug!("reply to unknown session {to} dropped");
                return;
            }
        };
        if !delivered {
            self.sessions.remove(&to);
            debug!("session {to} closed, removed");
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let Some(frame) = render(message) else {
            return;
        };
        self.sessions.retain(|id, session| {
            let delivered = session.send(frame.clone());
            if !delivered {
                debug!("session {id} closed, removed");
            }
            delivered
        });
    }
}

fn render(message: &ServerMessage) -> Option<String> {
    match message.to_frame() {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("failed to serialize outbound message: {e}");
            None
        }
    }
}
