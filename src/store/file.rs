//! File-per-job backend: `<root>/<namespace>/<job_id>.json`.
//!
//! Writes go to a hidden temp file in the same directory and are then renamed
//! over the target, so a reader running concurrently with a write sees either
//! the old record or the new one. Job IDs never start with `.`, so temp names
//! cannot collide with a record.

use crate::error::ReviewError;
use crate::model::JobId;
use crate::store::{Record, RecordStore};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug)]
pub struct FileStore<R> {
    dir: PathBuf,
    tmp_seq: AtomicU64,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> FileStore<R> {
    /// Store records of type `R` under `root/R::NAMESPACE`. The directory is
    /// created lazily on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(R::NAMESPACE),
            tmp_seq: AtomicU64::new(0),
            _record: PhantomData,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the job's record file.
    pub fn record_path(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }

    fn key(job_id: &JobId) -> String {
        format!("{}/{}", R::NAMESPACE, job_id)
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for FileStore<R> {
    async fn get(&self, job_id: &JobId) -> Result<Option<R>, ReviewError> {
        let path = self.record_path(job_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReviewError::StorageRead { path, source: e }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ReviewError::CorruptRecord {
                key: Self::key(job_id),
                detail: e.to_string(),
            })
    }

    async fn put(&self, job_id: &JobId, record: &R) -> Result<(), ReviewError> {
        let path = self.record_path(job_id);
        let json = serde_json::to_vec_pretty(record).map_err(|e| {
            ReviewError::Internal(format!("serialising {}: {e}", Self::key(job_id)))
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ReviewError::StorageWrite {
                path: self.dir.clone(),
                source: e,
            })?;

        // Atomic write: write to temp, then rename
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self.dir.join(format!(".{job_id}.{seq}.tmp"));
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| ReviewError::StorageWrite {
                path: tmp_path.clone(),
                source: e,
            })?;

        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(ReviewError::StorageWrite { path, source: e });
        }

        debug!("Wrote {} ({} bytes)", path.display(), json.len());
        Ok(())
    }
}
