//! Correction store: latest reviewer override per `(job, block index)`.
//!
//! The job's corrections are one [`CorrectionSet`] record. An upsert reads
//! it, replaces the entry at the block index and writes the whole set back.
//! The caller's [`JobGuard`] makes that read-modify-write atomic, so
//! concurrent upserts to different indices of one job all survive.

use crate::error::ReviewError;
use crate::model::{Correction, CorrectionSet, JobId};
use crate::store::{JobGuard, JobLocks, SharedStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// A correction already existed at this index and was replaced.
    pub replaced: bool,
    /// Number of corrected block indices for the job after the upsert.
    pub count: usize,
}

pub struct CorrectionStore {
    records: SharedStore<CorrectionSet>,
    locks: Arc<JobLocks>,
}

impl CorrectionStore {
    pub fn new(records: SharedStore<CorrectionSet>, locks: Arc<JobLocks>) -> Self {
        Self { records, locks }
    }

    /// Insert or replace the correction at `correction.block_index` of the
    /// guarded job.
    ///
    /// The index is not checked against the current layout.
    pub async fn upsert(
        &self,
        guard: &JobGuard,
        correction: Correction,
    ) -> Result<UpsertOutcome, ReviewError> {
        let job_id = self.locks.verify(guard)?;

        let mut set = self
            .records
            .get(job_id)
            .await?
            .unwrap_or_else(|| CorrectionSet::new(job_id.clone()));
        let index = correction.block_index;
        let replaced = set.corrections.insert(index, correction).is_some();
        self.records.put(job_id, &set).await?;

        debug!(
            "Correction for {} block index {} {}",
            job_id,
            index,
            if replaced { "replaced" } else { "added" }
        );
        Ok(UpsertOutcome {
            replaced,
            count: set.corrections.len(),
        })
    }

    /// The job's full correction set; empty for an unknown job.
    pub async fn set(&self, job_id: &JobId) -> Result<CorrectionSet, ReviewError> {
        Ok(self
            .records
            .get(job_id)
            .await?
            .unwrap_or_else(|| CorrectionSet::new(job_id.clone())))
    }

    /// All corrections of the job ordered by block index.
    pub async fn list(&self, job_id: &JobId) -> Result<Vec<Correction>, ReviewError> {
        Ok(self.set(job_id).await?.corrections.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn correction(index: usize, text: &str) -> Correction {
        Correction {
            block_index: index,
            original_text: "orig".into(),
            corrected_text: text.into(),
            table_html: None,
            timestamp: Utc::now(),
        }
    }

    fn store() -> CorrectionStore {
        CorrectionStore::new(
            Arc::new(MemoryStore::<CorrectionSet>::new()),
            Arc::new(JobLocks::new()),
        )
    }

    async fn upsert(
        store: &CorrectionStore,
        job: &JobId,
        correction: Correction,
    ) -> UpsertOutcome {
        let guard = store.locks.lock(job).await;
        store.upsert(&guard, correction).await.unwrap()
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins_per_index() {
        let store = store();
        let job = JobId::parse("job-1").unwrap();

        let first = upsert(&store, &job, correction(3, "first")).await;
        assert_eq!(first, UpsertOutcome { replaced: false, count: 1 });

        let second = upsert(&store, &job, correction(3, "second")).await;
        assert_eq!(second, UpsertOutcome { replaced: true, count: 1 });

        let list = store.list(&job).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].corrected_text, "second");
    }

    #[tokio::test]
    async fn unknown_job_lists_empty() {
        let store = store();
        let job = JobId::parse("never-seen").unwrap();
        assert!(store.list(&job).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_ordered_by_block_index() {
        let store = store();
        let job = JobId::parse("job-1").unwrap();
        for i in [7, 0, 42, 3] {
            upsert(&store, &job, correction(i, "x")).await;
        }
        let indices: Vec<usize> = store
            .list(&job)
            .await
            .unwrap()
            .iter()
            .map(|c| c.block_index)
            .collect();
        assert_eq!(indices, [0, 3, 7, 42]);
    }

    #[tokio::test]
    async fn jobs_are_isolated() {
        let store = store();
        let a = JobId::parse("job-a").unwrap();
        let b = JobId::parse("job-b").unwrap();
        upsert(&store, &a, correction(0, "a")).await;
        assert!(store.list(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn guard_from_another_registry_writes_nothing() {
        let store = store();
        let job = JobId::parse("job-1").unwrap();
        let elsewhere = JobLocks::new();
        let guard = elsewhere.lock(&job).await;

        let err = store.upsert(&guard, correction(0, "x")).await.unwrap_err();
        assert!(!err.is_validation());
        assert!(store.list(&job).await.unwrap().is_empty());
    }
}
