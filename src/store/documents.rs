//! Document store: the layout snapshot delivered by the OCR side and the
//! reviewer's saved Markdown, both per job.
//!
//! Saved Markdown, once present, supersedes the projection rendered from
//! layout + corrections (see [`crate::review::ReviewService::markdown`]).

use crate::error::ReviewError;
use crate::model::{JobId, LayoutSnapshot, SavedMarkdown};
use crate::store::{JobGuard, JobLocks, SharedStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

pub struct DocumentStore {
    layouts: SharedStore<LayoutSnapshot>,
    markdown: SharedStore<SavedMarkdown>,
    locks: Arc<JobLocks>,
}

impl DocumentStore {
    pub fn new(
        layouts: SharedStore<LayoutSnapshot>,
        markdown: SharedStore<SavedMarkdown>,
        locks: Arc<JobLocks>,
    ) -> Self {
        Self {
            layouts,
            markdown,
            locks,
        }
    }

    /// Record (or replace) the guarded job's layout snapshot.
    pub async fn put_layout(
        &self,
        guard: &JobGuard,
        snapshot: &LayoutSnapshot,
    ) -> Result<(), ReviewError> {
        let job_id = self.locks.verify(guard)?;
        self.layouts.put(job_id, snapshot).await?;
        debug!(
            "Stored layout for {} ({} regions)",
            job_id,
            snapshot.regions.len()
        );
        Ok(())
    }

    /// The job's layout snapshot, `None` until the layout model has run.
    pub async fn layout(&self, job_id: &JobId) -> Result<Option<LayoutSnapshot>, ReviewError> {
        self.layouts.get(job_id).await
    }

    /// Replace the guarded job's saved Markdown.
    pub async fn save_markdown(
        &self,
        guard: &JobGuard,
        markdown: String,
        saved_at: DateTime<Utc>,
    ) -> Result<SavedMarkdown, ReviewError> {
        let job_id = self.locks.verify(guard)?;
        let record = SavedMarkdown {
            job_id: job_id.clone(),
            markdown,
            saved_at,
        };
        self.markdown.put(job_id, &record).await?;
        debug!(
            "Saved {} bytes of Markdown for {}",
            record.markdown.len(),
            job_id
        );
        Ok(record)
    }

    pub async fn saved_markdown(
        &self,
        job_id: &JobId,
    ) -> Result<Option<SavedMarkdown>, ReviewError> {
        self.markdown.get(job_id).await
    }
}
