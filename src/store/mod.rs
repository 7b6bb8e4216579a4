//! Per-job persistence.
//!
//! All review state lives in small records keyed by job ID. The storage
//! medium sits behind [`RecordStore`], a two-method key-value interface
//! (`get`, `put`), so the typed stores built on top of it work unchanged over
//! the in-memory backend ([`memory`]) used in tests and the file-per-job
//! backend ([`file`]) used by the CLI.
//!
//! ```text
//!                 ┌───────────────────┐
//!  ReviewService ─┤ CorrectionStore   ├─┐
//!                 │ CheckpointStore   │ │  RecordStore<R>
//!                 │ FinalResultStore  │ ├──────────────▶ MemoryStore / FileStore
//!                 │ DocumentStore     ├─┘
//!                 └───────────────────┘
//!                           ▲
//!                 JobLocks ─┘ one shared registry, one async mutex per job
//! ```
//!
//! `put` always replaces the whole record. Typed-store writes take the
//! caller's [`JobGuard`] instead of locking themselves, so the service can
//! hold one guard across snapshot reads, timestamping and the write.
//! Merging (the correction upsert) happens above this layer, under that guard.

pub mod checkpoints;
pub mod corrections;
pub mod documents;
pub mod file;
pub mod locks;
pub mod memory;
pub mod results;

use crate::error::ReviewError;
use crate::model::{CheckpointRecord, CorrectionSet, FinalResult, JobId, LayoutSnapshot, SavedMarkdown};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub use checkpoints::CheckpointStore;
pub use corrections::{CorrectionStore, UpsertOutcome};
pub use documents::DocumentStore;
pub use file::FileStore;
pub use locks::{JobGuard, JobLocks};
pub use memory::MemoryStore;
pub use results::FinalResultStore;

/// A value persisted once per job.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Storage namespace (directory name for the file backend).
    const NAMESPACE: &'static str;
}

impl Record for CorrectionSet {
    const NAMESPACE: &'static str = "corrections";
}

impl Record for CheckpointRecord {
    const NAMESPACE: &'static str = "checkpoints";
}

impl Record for FinalResult {
    const NAMESPACE: &'static str = "results";
}

impl Record for LayoutSnapshot {
    const NAMESPACE: &'static str = "layouts";
}

impl Record for SavedMarkdown {
    const NAMESPACE: &'static str = "markdown";
}

/// Key-value persistence for one record type.
///
/// Implementations must make `put` atomic with respect to `get`: a concurrent
/// reader sees either the previous record or the new one, never a mix.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// The job's record, or `None` when nothing was ever stored for it.
    async fn get(&self, job_id: &JobId) -> Result<Option<R>, ReviewError>;

    /// Replace the job's record.
    async fn put(&self, job_id: &JobId, record: &R) -> Result<(), ReviewError>;
}

/// Shared handle to a record store.
pub type SharedStore<R> = Arc<dyn RecordStore<R>>;
