//! # layout-review
//!
//! Review engine for machine-extracted document layouts.
//!
//! A layout model (PP-Structure and friends) reports a flat list of regions
//! per page. This crate turns them into stable, addressable blocks, renders
//! those into editable Markdown carrying one invisible position anchor per
//! block, and keeps the per-job review records (corrections, checkpoint
//! answers, final verdict) that walk a document from draft to confirmed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! LayoutSnapshot
//!  │
//!  ├─ 1. Blocks    normalize labels, boxes and content into block_NNN
//!  ├─ 2. Overlay   apply the job's reviewer corrections
//!  ├─ 3. Render    anchored Markdown + anchor index
//!  └─ 4. Review    checkpoints → submit (confirmed | rejected → correct again)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use layout_review::{CorrectionRequest, ReviewConfig, ReviewService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReviewConfig::builder().data_dir("./review-data").build()?;
//!     let service = ReviewService::new(config);
//!
//!     let request = CorrectionRequest {
//!         block_index: Some(0),
//!         corrected_text: Some("Invoice".into()),
//!         ..Default::default()
//!     };
//!     service.upsert_correction("job-42", request).await?;
//!     println!("{}", service.markdown("job-42").await?.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `layout-review` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! layout-review = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod request;
pub mod review;
pub mod state;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ReviewConfig, ReviewConfigBuilder, StorageBackend};
pub use error::{ErrorBody, ErrorCategory, ReviewError};
pub use model::{
    BBox, Block, BlockContent, BlockType, CheckpointRecord, CheckpointResult, Correction,
    FinalResult, JobId, LayoutSnapshot, PageSize, RawRegion, ReviewStatus, Segment,
};
pub use output::{
    CheckpointView, CorrectionAck, CorrectionList, LayoutView, MarkdownSource, MarkdownView,
    SaveAck,
};
pub use pipeline::{build_blocks, parse_anchors, render_markdown, Anchor, RenderOptions};
pub use request::{CheckpointRequest, CorrectionRequest, SaveMarkdownRequest, SubmitRequest};
pub use review::ReviewService;
pub use state::{ReviewEvent, ReviewState};
