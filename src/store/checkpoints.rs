//! Checkpoint store: the job's latest verification Q&A snapshot.
//!
//! `save` replaces the record wholesale. Results from an earlier save are
//! never merged into a later one.

use crate::error::ReviewError;
use crate::model::{CheckpointRecord, CheckpointResult, JobId};
use crate::store::{JobGuard, JobLocks, SharedStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

pub struct CheckpointStore {
    records: SharedStore<CheckpointRecord>,
    locks: Arc<JobLocks>,
}

impl CheckpointStore {
    pub fn new(records: SharedStore<CheckpointRecord>, locks: Arc<JobLocks>) -> Self {
        Self { records, locks }
    }

    /// Replace the guarded job's checkpoint record.
    pub async fn save(
        &self,
        guard: &JobGuard,
        results: Vec<CheckpointResult>,
        saved_at: DateTime<Utc>,
    ) -> Result<CheckpointRecord, ReviewError> {
        let job_id = self.locks.verify(guard)?;
        let record = CheckpointRecord {
            job_id: job_id.clone(),
            results,
            saved_at,
        };
        self.records.put(job_id, &record).await?;
        debug!(
            "Saved {} checkpoint results for {}",
            record.results.len(),
            job_id
        );
        Ok(record)
    }

    /// The job's checkpoint record, `None` if none was ever saved.
    pub async fn get(&self, job_id: &JobId) -> Result<Option<CheckpointRecord>, ReviewError> {
        self.records.get(job_id).await
    }
}
