//! Durable write-back cache actor for durocache.
//!
//! One [`ProfileActor`] per entity key holds the authoritative profile,
//! absorbs writes immediately, journals them, and lets the sync scheduler
//! batch them into the backing store on an alarm. Every accepted write is
//! broadcast to the actor's live sessions.
//!
//! # Architecture
//!
//! - [`protocol`]: tagged JSON messages exchanged with clients
//! - [`ProfileActor`]: the message façade over cache, log and scheduler
//! - [`runtime`]: mailbox + single consumer task serializing each actor
//! - [`ActorRegistry`]: supervisor map that spawns one runtime per key

mod actor;
mod clock;
pub mod config;
mod error;
pub mod protocol;
pub mod registry;
pub mod runtime;
mod session;

pub use actor::{ActorStats, ProfileActor, UpdateOutcome};
pub use clock::TokioClock;
pub use config::{ActorConfig, StoreLocation};
pub use error::{ActorError, ActorResult};
pub use protocol::{ClientMessage, MalformedMessageError, ServerMessage, parse_client_message};
pub use registry::{ActorRegistry, MemoryStoreProvider, SqliteStoreProvider, StoreProvider};
pub use runtime::{ActorCommand, ActorHandle, ActorRuntime, create_actor_runtime, spawn_actor};
pub use session::{Session, SessionSink};
