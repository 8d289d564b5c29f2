//! Runtime clock.

use durocache_types::{Clock, SystemClock, Timestamp};
use tokio::time::Instant;

/// Monotonic clock anchored to the wall clock at creation.
///
/// Time is measured with `tokio::time::Instant`, so it never goes backwards
/// and follows a paused test runtime exactly like the actor's alarm timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
    origin_millis: Timestamp,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::anchored_at(SystemClock.now_millis())
    }

    /// Starts the clock at `millis` instead of the current wall time.
    pub fn anchored_at(millis: Timestamp) -> Self {
        Self {
            origin: Instant::now(),
            origin_millis: millis,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_millis(&self) -> Timestamp {
        self.origin_millis + self.origin.elapsed().as_millis() as i64
    }
}
