//! Final result store: the job's latest confirm/reject submission.
//!
//! A submission overwrites the previous one, whatever its status. Only the
//! latest record is retained; earlier rejections are not kept as history.

use crate::error::ReviewError;
use crate::model::{FinalResult, JobId};
use crate::store::{JobGuard, JobLocks, SharedStore};
use std::sync::Arc;
use tracing::debug;

pub struct FinalResultStore {
    records: SharedStore<FinalResult>,
    locks: Arc<JobLocks>,
}

impl FinalResultStore {
    pub fn new(records: SharedStore<FinalResult>, locks: Arc<JobLocks>) -> Self {
        Self { records, locks }
    }

    /// Write or overwrite the guarded job's terminal record.
    pub async fn submit(&self, guard: &JobGuard, result: &FinalResult) -> Result<(), ReviewError> {
        let job_id = self.locks.verify(guard)?;
        if *job_id != result.job_id {
            return Err(ReviewError::Internal(format!(
                "submission for {} written under the lock of {}",
                result.job_id, job_id
            )));
        }
        self.records.put(job_id, result).await?;
        debug!("Stored {} submission for {}", result.status, result.job_id);
        Ok(())
    }

    /// The job's latest submission, `None` if it was never submitted.
    pub async fn get(&self, job_id: &JobId) -> Result<Option<FinalResult>, ReviewError> {
        self.records.get(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReviewStatus;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use serde_json::json;

    fn result(job: &JobId, status: ReviewStatus, note: &str) -> FinalResult {
        FinalResult {
            job_id: job.clone(),
            status,
            extracted_data: json!({ "note": note }),
            checkpoint_results: vec![],
            corrections: vec![],
            filename: "invoice.pdf".into(),
            saved_at: Utc::now(),
        }
    }

    fn store() -> FinalResultStore {
        FinalResultStore::new(
            Arc::new(MemoryStore::<FinalResult>::new()),
            Arc::new(JobLocks::new()),
        )
    }

    #[tokio::test]
    async fn later_submission_overwrites() {
        let store = store();
        let job = JobId::parse("job-1").unwrap();

        for (status, note) in [
            (ReviewStatus::Rejected, "first"),
            (ReviewStatus::Rejected, "second"),
            (ReviewStatus::Confirmed, "final"),
        ] {
            let guard = store.locks.lock(&job).await;
            store.submit(&guard, &result(&job, status, note)).await.unwrap();
        }

        let got = store.get(&job).await.unwrap().unwrap();
        assert_eq!(got.status, ReviewStatus::Confirmed);
        assert_eq!(got.extracted_data["note"], json!("final"));
    }

    #[tokio::test]
    async fn submission_under_another_jobs_lock_is_refused() {
        let store = store();
        let a = JobId::parse("job-a").unwrap();
        let b = JobId::parse("job-b").unwrap();

        let guard = store.locks.lock(&a).await;
        let err = store
            .submit(&guard, &result(&b, ReviewStatus::Confirmed, "x"))
            .await
            .unwrap_err();
        assert!(!err.is_validation());
        assert_eq!(store.get(&b).await.unwrap(), None);
    }
}
