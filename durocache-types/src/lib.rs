//! Core types for durocache.
//!
//! This crate defines the vocabulary shared by every other crate:
//! - [`Profile`]: the cached entity owned by a single actor instance
//! - [`Clock`]: the time source (wall clock in production, manual in tests)
//! - [`SessionId`]: identifier for a live client connection

mod clock;
mod profile;
mod session;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use profile::{Profile, STUB_EMAIL, STUB_NAME};
pub use session::SessionId;
