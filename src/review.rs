//! Client-facing review operations.
//!
//! [`ReviewService`] owns the four per-job stores and exposes every read and
//! write a review client performs. It is constructed once from a
//! [`ReviewConfig`] and shared (it is `Send + Sync`; wrap it in an `Arc`).
//!
//! Write operations validate their request first and only then touch a
//! store, so a rejected request never persists anything. Every write then
//! takes the job's guard from the one [`JobLocks`] registry the stores share,
//! and reads the clock only while holding it: same-job writes are
//! linearizable and their timestamps follow lock order. Reads of a job the
//! service has never seen return well-formed empty payloads.

use crate::config::{ReviewConfig, StorageBackend};
use crate::error::ReviewError;
use crate::model::{CheckpointRecord, FinalResult, JobId, LayoutSnapshot};
use crate::output::{
    CheckpointView, CorrectionAck, CorrectionList, LayoutView, MarkdownSource, MarkdownView,
    SaveAck,
};
use crate::pipeline::{apply_corrections, build_blocks, parse_anchors, render_markdown, BlockModel, RenderOptions};
use crate::request::{CheckpointRequest, CorrectionRequest, SaveMarkdownRequest, SubmitRequest};
use crate::state::{self, JobActivity, ReviewEvent, ReviewState};
use crate::store::{
    CheckpointStore, CorrectionStore, DocumentStore, FileStore, FinalResultStore, JobLocks,
    MemoryStore, Record, SharedStore,
};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Review engine for one storage backend.
pub struct ReviewService {
    config: ReviewConfig,
    render: RenderOptions,
    documents: DocumentStore,
    corrections: CorrectionStore,
    checkpoints: CheckpointStore,
    results: FinalResultStore,
    locks: Arc<JobLocks>,
    clock: MonotonicClock,
}

impl ReviewService {
    /// Build the stores for `config.storage`. File stores create their
    /// directories lazily, so this never touches the disk.
    pub fn new(config: ReviewConfig) -> Self {
        match &config.storage {
            StorageBackend::Memory => debug!("Using in-memory review storage"),
            StorageBackend::Files(dir) => debug!("Using review storage at {}", dir.display()),
        }
        let locks = Arc::new(JobLocks::new());
        Self {
            render: config.render_options(),
            documents: DocumentStore::new(
                backend(&config.storage),
                backend(&config.storage),
                Arc::clone(&locks),
            ),
            corrections: CorrectionStore::new(backend(&config.storage), Arc::clone(&locks)),
            checkpoints: CheckpointStore::new(backend(&config.storage), Arc::clone(&locks)),
            results: FinalResultStore::new(backend(&config.storage), Arc::clone(&locks)),
            locks,
            clock: MonotonicClock::new(),
            config,
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    // ── Layout ───────────────────────────────────────────────────────────

    /// Record the layout snapshot produced by the OCR side.
    pub async fn ingest_layout(
        &self,
        job_id: &str,
        snapshot: LayoutSnapshot,
    ) -> Result<(), ReviewError> {
        let job_id = JobId::parse(job_id)?;
        let guard = self.locks.lock(&job_id).await;
        self.documents.put_layout(&guard, &snapshot).await?;
        drop(guard);
        info!(
            "Layout ingested for {}: {} regions",
            job_id,
            snapshot.regions.len()
        );
        Ok(())
    }

    /// Normalized blocks of the job with reviewer corrections applied.
    pub async fn layout(&self, job_id: &str) -> Result<LayoutView, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        let model = self.corrected_model(&job_id).await?;
        Ok(LayoutView {
            job_id,
            image_width: model.page.width,
            image_height: model.page.height,
            blocks: model.blocks,
        })
    }

    async fn corrected_model(&self, job_id: &JobId) -> Result<BlockModel, ReviewError> {
        let (snapshot, corrections) = futures::try_join!(
            self.documents.layout(job_id),
            self.corrections.set(job_id)
        )?;
        let mut model = build_blocks(snapshot.as_ref(), self.config.fallback_page);
        let applied = apply_corrections(&mut model.blocks, corrections.corrections.values());
        debug!(
            "Built {} blocks for {} ({} corrected)",
            model.blocks.len(),
            job_id,
            applied
        );
        Ok(model)
    }

    // ── Markdown ─────────────────────────────────────────────────────────

    /// The job's editable Markdown: the saved document when one exists,
    /// otherwise a fresh rendering of layout + corrections.
    pub async fn markdown(&self, job_id: &str) -> Result<MarkdownView, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        if let Some(saved) = self.documents.saved_markdown(&job_id).await? {
            return Ok(MarkdownView {
                anchors: parse_anchors(&saved.markdown),
                markdown: saved.markdown,
                source: MarkdownSource::Saved,
                saved_at: Some(saved.saved_at),
                job_id,
            });
        }

        let model = self.corrected_model(&job_id).await?;
        let rendered = render_markdown(&model.blocks, &self.render);
        Ok(MarkdownView {
            job_id,
            markdown: rendered.markdown,
            anchors: rendered.anchors,
            source: MarkdownSource::Rendered,
            saved_at: None,
        })
    }

    pub async fn save_markdown(
        &self,
        job_id: &str,
        request: SaveMarkdownRequest,
    ) -> Result<SaveAck, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        let markdown = request.validate()?;
        let guard = self.locks.lock(&job_id).await;
        let saved = self
            .documents
            .save_markdown(&guard, markdown, self.clock.now())
            .await?;
        drop(guard);
        info!("Markdown saved for {}", job_id);
        Ok(SaveAck {
            job_id,
            saved_at: saved.saved_at,
        })
    }

    // ── Corrections ──────────────────────────────────────────────────────

    /// Insert or replace the correction of one block.
    pub async fn upsert_correction(
        &self,
        job_id: &str,
        request: CorrectionRequest,
    ) -> Result<CorrectionAck, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        request.validate()?;

        let guard = self.locks.lock(&job_id).await;
        let correction = request.into_correction(self.clock.now())?;
        let block_index = correction.block_index;
        let timestamp = correction.timestamp;
        let outcome = self.corrections.upsert(&guard, correction).await?;
        drop(guard);
        info!(
            "Correction {} for {} block index {} ({} corrected)",
            if outcome.replaced { "replaced" } else { "saved" },
            job_id,
            block_index,
            outcome.count
        );
        Ok(CorrectionAck {
            job_id,
            block_index,
            replaced: outcome.replaced,
            count: outcome.count,
            timestamp,
        })
    }

    pub async fn corrections(&self, job_id: &str) -> Result<CorrectionList, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        let corrections = self.corrections.list(&job_id).await?;
        Ok(CorrectionList {
            count: corrections.len(),
            job_id,
            corrections,
        })
    }

    // ── Checkpoints ──────────────────────────────────────────────────────

    /// Replace the job's checkpoint results.
    pub async fn save_checkpoints(
        &self,
        job_id: &str,
        request: CheckpointRequest,
    ) -> Result<CheckpointRecord, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        let results = request.validate()?;
        let guard = self.locks.lock(&job_id).await;
        let record = self
            .checkpoints
            .save(&guard, results, self.clock.now())
            .await?;
        drop(guard);
        info!(
            "Checkpoints saved for {}: {} results",
            job_id,
            record.results.len()
        );
        Ok(record)
    }

    pub async fn checkpoints(&self, job_id: &str) -> Result<CheckpointView, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        Ok(match self.checkpoints.get(&job_id).await? {
            Some(record) => CheckpointView {
                job_id,
                results: record.results,
                saved_at: Some(record.saved_at),
            },
            None => CheckpointView {
                job_id,
                results: Vec::new(),
                saved_at: None,
            },
        })
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Confirm or reject the job.
    ///
    /// Allowed in any state. Overwrites the previous submission and leaves
    /// the correction and checkpoint records untouched, so a rejected job can
    /// go straight back to correction.
    ///
    /// Omitted checkpoint results and corrections are snapshotted under the
    /// job's guard, so the result holds exactly the writes stamped before its
    /// `saved_at`.
    pub async fn submit(
        &self,
        job_id: &str,
        request: SubmitRequest,
    ) -> Result<FinalResult, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        let status = request.validate()?;

        let guard = self.locks.lock(&job_id).await;
        let checkpoint_results = match request.checkpoint_results {
            Some(results) => results,
            None => self
                .checkpoints
                .get(&job_id)
                .await?
                .map(|r| r.results)
                .unwrap_or_default(),
        };
        let corrections = match request.corrections {
            Some(corrections) => corrections,
            None => self.corrections.list(&job_id).await?,
        };

        let result = FinalResult {
            job_id: job_id.clone(),
            status,
            extracted_data: request
                .extracted_data
                .unwrap_or_else(|| Value::Object(Default::default())),
            checkpoint_results,
            corrections,
            filename: request.filename.unwrap_or_default(),
            saved_at: self.clock.now(),
        };
        self.results.submit(&guard, &result).await?;
        drop(guard);
        info!(
            "Job {} {} ({} corrections, {} checkpoint results)",
            job_id,
            status,
            result.corrections.len(),
            result.checkpoint_results.len()
        );
        Ok(result)
    }

    /// The job's latest submission, if any.
    pub async fn final_result(&self, job_id: &str) -> Result<Option<FinalResult>, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        self.results.get(&job_id).await
    }

    // ── State ────────────────────────────────────────────────────────────

    /// Current review state, derived from the stores.
    ///
    /// The five records are read under the job's guard so the fold never
    /// mixes records from before and after a concurrent write.
    pub async fn state(&self, job_id: &str) -> Result<ReviewState, ReviewError> {
        let job_id = JobId::parse(job_id)?;
        let guard = self.locks.lock(&job_id).await;
        let (layout, corrections, markdown, checkpoints, result) = futures::try_join!(
            self.documents.layout(&job_id),
            self.corrections.set(&job_id),
            self.documents.saved_markdown(&job_id),
            self.checkpoints.get(&job_id),
            self.results.get(&job_id),
        )?;
        drop(guard);

        let mut activity = JobActivity::new().with_layout(layout.is_some());
        for correction in corrections.corrections.values() {
            activity.record(correction.timestamp, ReviewEvent::Corrected);
        }
        if let Some(saved) = markdown {
            activity.record(saved.saved_at, ReviewEvent::MarkdownSaved);
        }
        if let Some(record) = checkpoints {
            activity.record(record.saved_at, ReviewEvent::CheckpointSaved);
        }
        if let Some(result) = result {
            activity.record(result.saved_at, ReviewEvent::Submitted(result.status));
        }

        let state = state::derive(&activity);
        debug!("Derived state of {}: {}", job_id, state);
        Ok(state)
    }
}

fn backend<R: Record>(storage: &StorageBackend) -> SharedStore<R> {
    match storage {
        StorageBackend::Memory => Arc::new(MemoryStore::<R>::new()),
        StorageBackend::Files(dir) => Arc::new(FileStore::<R>::new(dir)),
    }
}

/// UTC clock whose readings strictly increase within the process, so two
/// writes never share a timestamp.
#[derive(Debug, Default)]
struct MonotonicClock {
    last_nanos: AtomicI64,
}

impl MonotonicClock {
    fn new() -> Self {
        Self::default()
    }

    fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX - 1);
        let prev = self
            .last_nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(wall.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        Utc.timestamp_nanos(wall.max(prev + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> ReviewService {
        ReviewService::new(ReviewConfig::default())
    }

    fn correction(index: i64, text: &str) -> CorrectionRequest {
        CorrectionRequest {
            block_index: Some(index),
            corrected_text: Some(text.into()),
            ..Default::default()
        }
    }

    #[test]
    fn clock_is_strictly_increasing() {
        let clock = MonotonicClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[tokio::test]
    async fn invalid_job_id_is_a_validation_error() {
        let err = service().layout("../etc").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn rejected_write_persists_nothing() {
        let svc = service();
        let err = svc
            .upsert_correction("job-1", CorrectionRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(svc.corrections("job-1").await.unwrap().count, 0);
        assert_eq!(svc.state("job-1").await.unwrap(), ReviewState::Created);
    }

    #[tokio::test]
    async fn corrections_show_up_in_layout_and_markdown() {
        let svc = service();
        let snapshot: LayoutSnapshot = serde_json::from_value(json!([
            {"type": "title", "bbox": [10, 10, 110, 40], "content": "Invoce"},
            {"type": "text", "bbox": [10, 50, 210, 90], "content": "Body"}
        ]))
        .unwrap();
        svc.ingest_layout("job-1", snapshot).await.unwrap();
        svc.upsert_correction("job-1", correction(0, "Invoice"))
            .await
            .unwrap();

        let layout = svc.layout("job-1").await.unwrap();
        assert!(layout.blocks[0].corrected);
        assert!(!layout.blocks[1].corrected);

        let md = svc.markdown("job-1").await.unwrap();
        assert_eq!(md.source, MarkdownSource::Rendered);
        assert!(md.markdown.contains("# Invoice\n"));
        assert_eq!(md.anchors.len(), 2);
    }

    #[tokio::test]
    async fn saved_markdown_supersedes_rendering() {
        let svc = service();
        svc.save_markdown(
            "job-1",
            SaveMarkdownRequest {
                markdown: Some("<!-- @block:block_001 1,2,3,4 -->\nEdited\n".into()),
            },
        )
        .await
        .unwrap();
        let md = svc.markdown("job-1").await.unwrap();
        assert_eq!(md.source, MarkdownSource::Saved);
        assert!(md.saved_at.is_some());
        assert_eq!(md.anchors.len(), 1);
        assert_eq!(md.anchors[0].block_id, "block_001");
    }

    #[tokio::test]
    async fn submit_snapshots_omitted_fields() {
        let svc = service();
        svc.upsert_correction("job-1", correction(2, "fixed"))
            .await
            .unwrap();
        svc.save_checkpoints(
            "job-1",
            serde_json::from_value(json!({"results": [{"question": "Total?", "answer": "12"}]}))
                .unwrap(),
        )
        .await
        .unwrap();

        let result = svc
            .submit(
                "job-1",
                SubmitRequest {
                    status: Some("confirmed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(result.corrections.len(), 1);
        assert_eq!(result.checkpoint_results.len(), 1);
        assert_eq!(result.extracted_data, json!({}));
    }
}
