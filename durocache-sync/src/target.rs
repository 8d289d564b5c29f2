//! The backing-store seam.
//!
//! The scheduler only knows how to hand a batch of profiles to a
//! [`SyncTarget`] and observe success or failure. Real database clients,
//! in-process recorders and fault injectors all plug in here.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use durocache_types::Profile;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Destination for drained profiles.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Pushes `profiles` (oldest first) as one batch. Any error is retryable.
    async fn sync_batch(&self, profiles: &[Profile]) -> SyncResult<()>;
}

#[async_trait]
impl<T: SyncTarget + ?Sized> SyncTarget for Arc<T> {
    async fn sync_batch(&self, profiles: &[Profile]) -> SyncResult<()> {
        (**self).sync_batch(profiles).await
    }
}

// ── MemoryTarget ────────────────────────────────────────────────

/// Records every accepted batch in memory.
///
/// `fail_next(n)` makes the next `n` calls fail without recording anything,
/// which is how tests simulate an unavailable database.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    batches: Mutex<Vec<Vec<Profile>>>,
    fail_next: AtomicUsize,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls fail.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Returns the batches accepted so far, in call order.
    pub fn batches(&self) -> Vec<Vec<Profile>> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns every accepted profile, flattened in call order.
    pub fn synced_profiles(&self) -> Vec<Profile> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl SyncTarget for MemoryTarget {
    async fn sync_batch(&self, profiles: &[Profile]) -> SyncResult<()> {
        let should_fail = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(SyncError::Unavailable("simulated outage".to_string()));
        }

        debug!("memory target accepted batch of {}", profiles.len());
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(profiles.to_vec());
        Ok(())
    }
}

// ── FaultInjectingTarget ────────────────────────────────────────

/// Deterministic failure schedule for [`FaultInjectingTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPlan {
    /// Never fail; pass every call through.
    Never,
    /// Fail every call.
    Always,
    /// Fail the first `n` calls, then pass through.
    FirstN(u64),
    /// Fail every `n`th call (1-based), pass through the rest.
    EveryNth(u64),
}

/// Wraps another target and fails calls according to a [`FaultPlan`].
pub struct FaultInjectingTarget<T> {
    inner: T,
    plan: FaultPlan,
    calls: AtomicU64,
}

impl<T: SyncTarget> FaultInjectingTarget<T> {
    pub fn new(inner: T, plan: FaultPlan) -> Self {
        Self {
            inner,
            plan,
            calls: AtomicU64::new(0),
        }
    }

    /// Number of calls seen so far, failed or not.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: SyncTarget> SyncTarget for FaultInjectingTarget<T> {
    async fn sync_batch(&self, profiles: &[Profile]) -> SyncResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = match self.plan {
            FaultPlan::Never => false,
            FaultPlan::Always => true,
            FaultPlan::FirstN(n) => call <= n,
            FaultPlan::EveryNth(n) => n > 0 && call % n == 0,
        };
        if fail {
            return Err(SyncError::Injected(call));
        }
        self.inner.sync_batch(profiles).await
    }
}
