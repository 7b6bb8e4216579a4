//! Per-job serialization point.
//!
//! One [`JobLocks`] registry is shared by the service and every typed store.
//! Writes to a job's records take a [`JobGuard`] from it and keep it across
//! the whole read-stamp-write sequence, so same-job writes are linearizable
//! and their timestamps follow lock order. The registry itself is behind a
//! plain `std` mutex that is held only long enough to clone the job's `Arc`;
//! no I/O ever happens under it, so different jobs proceed in parallel.

use crate::error::ReviewError;
use crate::model::JobId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry size above which idle entries are pruned on the next lookup.
const PRUNE_THRESHOLD: usize = 256;

/// Hands out one async mutex per job ID.
#[derive(Debug, Default)]
pub struct JobLocks {
    registry: Mutex<HashMap<JobId, Arc<AsyncMutex<()>>>>,
}

/// Exclusive access to one job, released on drop.
///
/// The mutex is not reentrant: code holding a guard must not lock the same
/// job again.
#[derive(Debug)]
pub struct JobGuard {
    job_id: JobId,
    guard: OwnedMutexGuard<()>,
}

impl JobGuard {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `job_id`.
    pub async fn lock(&self, job_id: &JobId) -> JobGuard {
        let mutex = {
            let mut registry = self
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if registry.len() > PRUNE_THRESHOLD {
                // An entry only the registry references has no holder and no waiter.
                registry.retain(|_, m| Arc::strong_count(m) > 1);
            }
            Arc::clone(registry.entry(job_id.clone()).or_default())
        };
        JobGuard {
            job_id: job_id.clone(),
            guard: mutex.lock_owned().await,
        }
    }

    /// Check that `guard` was handed out by this registry and return its job.
    ///
    /// A held guard keeps its entry alive, so pruning cannot have dropped it.
    pub fn verify<'g>(&self, guard: &'g JobGuard) -> Result<&'g JobId, ReviewError> {
        let registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match registry.get(&guard.job_id) {
            Some(mutex) if Arc::ptr_eq(mutex, OwnedMutexGuard::mutex(&guard.guard)) => {
                Ok(&guard.job_id)
            }
            _ => Err(ReviewError::Internal(format!(
                "lock for {} was taken from another registry",
                guard.job_id
            ))),
        }
    }

    /// Number of jobs currently tracked (held, awaited or not yet pruned).
    pub fn tracked(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
