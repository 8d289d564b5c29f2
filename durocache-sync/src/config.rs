//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default spacing between drain attempts.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the sync scheduler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minimum spacing between drain attempts, in milliseconds.
    pub sync_interval_ms: u64,

    /// Max intents pushed per drain. 0 = unlimited.
    pub max_batch_size: usize,

    /// Optional exponential backoff after consecutive failed drains.
    pub backoff: Option<BackoffConfig>,
}

/// Capped exponential backoff for failed drains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Factor applied to the interval per consecutive failure.
    pub multiplier: u32,

    /// Upper bound on the retry delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sync_interval_ms: SYNC_INTERVAL.as_millis() as u64,
            max_batch_size: 0,
            backoff: None,
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            multiplier: 2,
            max_delay_ms: 15 * 60 * 1000, // 15 min
        }
    }
}

impl SchedulerConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    /// Delay before the next attempt after `consecutive_failures` failed
    /// drains in a row. Without backoff this is always the sync interval.
    pub fn retry_delay_ms(&self, consecutive_failures: u32) -> u64 {
        let interval = self.sync_interval_ms;
        match &self.backoff {
            Some(backoff) if consecutive_failures > 0 => {
                let factor = u64::from(backoff.multiplier.max(1)).saturating_pow(consecutive_failures);
                interval
                    .saturating_mul(factor)
                    .min(backoff.max_delay_ms)
                    .max(interval)
            }
            _ => interval,
        }
    }
}
