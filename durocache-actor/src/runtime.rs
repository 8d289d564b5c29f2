//! Mailbox runtime for one actor.
//!
//! Every event for an entity goes through a bounded mpsc channel consumed by a
//! single task, so the actor never sees two events at once. The durable alarm
//! is turned into a timer inside the same `select!` loop.

use crate::actor::{ActorStats, ProfileActor};
use crate::error::{ActorError, ActorResult};
use crate::session::Session;
use durocache_sync::DrainOutcome;
use durocache_types::{Clock, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Commands accepted by an actor's mailbox.
#[derive(Debug)]
pub enum ActorCommand {
    /// A client connected.
    Connect { session: Session },
    /// A client went away.
    Disconnect { session_id: SessionId },
    /// A raw frame arrived from a client.
    Message { session_id: SessionId, raw: String },
    /// Run the alarm logic now instead of waiting.
    ForceSync {
        reply: oneshot::Sender<ActorResult<DrainOutcome>>,
    },
    /// Report a stats snapshot.
    Stats {
        reply: oneshot::Sender<ActorResult<ActorStats>>,
    },
    /// Stop the runtime after a final best-effort drain.
    Shutdown,
}

/// Cloneable handle to a running actor.
#[derive(Clone, Debug)]
pub struct ActorHandle {
    entity_id: Arc<str>,
    command_tx: mpsc::Sender<ActorCommand>,
}

impl ActorHandle {
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Queues a raw command.
    pub async fn send(&self, cmd: ActorCommand) -> ActorResult<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| ActorError::MailboxClosed)
    }

    pub async fn connect(&self, session: Session) -> ActorResult<()> {
        self.send(ActorCommand::Connect { session }).await
    }

    pub async fn disconnect(&self, session_id: SessionId) -> ActorResult<()> {
        self.send(ActorCommand::Disconnect { session_id }).await
    }

    pub async fn message(&self, session_id: SessionId, raw: impl Into<String>) -> ActorResult<()> {
        self.send(ActorCommand::Message {
            session_id,
            raw: raw.into(),
        })
        .await
    }

    /// Fires the alarm logic immediately and waits for the outcome.
    pub async fn force_sync(&self) -> ActorResult<DrainOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(ActorCommand::ForceSync { reply }).await?;
        rx.await.map_err(|_| ActorError::MailboxClosed)?
    }

    pub async fn stats(&self) -> ActorResult<ActorStats> {
        let (reply, rx) = oneshot::channel();
        self.send(ActorCommand::Stats { reply }).await?;
        rx.await.map_err(|_| ActorError::MailboxClosed)?
    }

    pub async fn shutdown(&self) -> ActorResult<()> {
        self.send(ActorCommand::Shutdown).await
    }

    /// True once the runtime has stopped.
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }
}

/// Single-consumer event loop that owns a [`ProfileActor`].
pub struct ActorRuntime {
    actor: ProfileActor,
    command_rx: mpsc::Receiver<ActorCommand>,
    clock: Arc<dyn Clock>,
}

/// Creates a runtime and its handle. Call [`ActorRuntime::run`] (or
/// [`spawn_actor`]) to start processing.
pub fn create_actor_runtime(
    actor: ProfileActor,
    clock: Arc<dyn Clock>,
    mailbox_capacity: usize,
) -> (ActorHandle, ActorRuntime) {
    let (command_tx, command_rx) = mpsc::channel(mailbox_capacity.max(1));
    let handle = ActorHandle {
        entity_id: Arc::from(actor.entity_id()),
        command_tx,
    };
    let runtime = ActorRuntime {
        actor,
        command_rx,
        clock,
    };
    (handle, runtime)
}

/// Creates a runtime and runs it on a new tokio task.
pub fn spawn_actor(
    actor: ProfileActor,
    clock: Arc<dyn Clock>,
    mailbox_capacity: usize,
) -> (ActorHandle, JoinHandle<()>) {
    let (handle, runtime) = create_actor_runtime(actor, clock, mailbox_capacity);
    (handle, tokio::spawn(runtime.run()))
}

impl ActorRuntime {
    /// Runs until shutdown or until every handle is dropped.
    ///
    /// Startup recovery completes before the first command is taken from the
    /// mailbox.
    pub async fn run(mut self) {
        let entity_id = self.actor.entity_id().to_string();
        match self.actor.on_init().await {
            Ok(Some(outcome)) => info!("actor {entity_id} recovered pending sync: {outcome:?}"),
            Ok(None) => {}
            Err(e) => error!("actor {entity_id} recovery failed: {e}"),
        }

        loop {
            let wake = self.alarm_delay();
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(ActorCommand::Shutdown) => {
                            info!("actor {entity_id} shutting down");
                            self.final_drain().await;
                            break;
                        }
                        Some(cmd) => self.handle(cmd).await,
                        None => {
                            info!("actor {entity_id} mailbox closed, stopping");
                            break;
                        }
                    }
                }
                _ = sleep_for(wake) => {
                    debug!("actor {entity_id} alarm fired");
                    if let Err(e) = self.actor.on_alarm().await {
                        error!("actor {entity_id} alarm failed: {e}");
                    }
                }
            }
        }

        info!("actor {entity_id} stopped");
    }

    async fn handle(&mut self, cmd: ActorCommand) {
        match cmd {
            ActorCommand::Connect { session } => {
                if let Err(e) = self.actor.on_connect(session) {
                    error!("connect failed on {}: {e}", self.actor.entity_id());
                }
            }
            ActorCommand::Disconnect { session_id } => {
                self.actor.on_disconnect(session_id);
            }
            ActorCommand::Message { session_id, raw } => {
                if let Err(e) = self.actor.on_message(session_id, &raw) {
                    error!("message from {session_id} failed: {e}");
                }
            }
            ActorCommand::ForceSync { reply } => {
                let outcome = self.actor.on_alarm().await;
                if reply.send(outcome).is_err() {
                    debug!("force_sync caller went away");
                }
            }
            ActorCommand::Stats { reply } => {
                if reply.send(self.actor.stats()).is_err() {
                    debug!("stats caller went away");
                }
            }
            // Intercepted by the run loop before dispatch.
            ActorCommand::Shutdown => {}
        }
    }

    async fn final_drain(&mut self) {
        if self.actor.next_alarm().is_none() {
            return;
        }
        match self.actor.on_alarm().await {
            Ok(outcome) => debug!("final drain: {outcome:?}"),
            Err(e) => warn!("final drain failed, intents stay queued: {e}"),
        }
    }

    fn alarm_delay(&self) -> Option<Duration> {
        self.actor.next_alarm().map(|at| {
            let remaining = at.saturating_sub(self.clock.now_millis()).max(0);
            Duration::from_millis(remaining as u64)
        })
    }
}

async fn sleep_for(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}
