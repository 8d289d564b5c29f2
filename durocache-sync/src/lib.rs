//! Sync scheduling for durocache.
//!
//! Drains the durable pending-write log into a backing store on an alarm,
//! retrying failed batches on the next alarm instead of surfacing them.
//!
//! # Architecture
//!
//! - [`SyncTarget`] is the only contact point with the backing database
//! - [`SyncScheduler`] owns the alarm slot and the Idle/Armed/Draining cycle
//! - [`SchedulerConfig`] sets the interval, batch bound and optional backoff

pub mod config;
mod error;
pub mod scheduler;
pub mod target;

pub use config::{BackoffConfig, SYNC_INTERVAL, SchedulerConfig};
pub use error::{SyncError, SyncResult};
pub use scheduler::{DrainOutcome, SchedulerState, SyncScheduler};
pub use target::{FaultInjectingTarget, FaultPlan, MemoryTarget, SyncTarget};
