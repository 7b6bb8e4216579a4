//! Core data types: job identifiers, blocks, raw layout snapshots and the
//! per-job review records persisted by [`crate::store`].
//!
//! JSON field names are camelCase because these types double as the
//! client-facing payloads. Raw layout types accept several aliases so dumps
//! from different layout models ingest without a conversion step.

use crate::error::ReviewError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ── Job identifiers ──────────────────────────────────────────────────────

/// Longest accepted job identifier.
pub const MAX_JOB_ID_LEN: usize = 128;

/// Identifier of one document's review lifecycle.
///
/// Job IDs double as storage keys (file names for the file backend), so only
/// `[A-Za-z0-9_.-]` is accepted and a leading `.` is refused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Validate a caller-supplied job identifier.
    pub fn parse(raw: &str) -> Result<Self, ReviewError> {
        let invalid = |reason: &str| ReviewError::InvalidJobId {
            job_id: raw.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ReviewError::MissingField { field: "jobId" });
        }
        if trimmed.len() > MAX_JOB_ID_LEN {
            return Err(invalid("longer than 128 characters"));
        }
        if trimmed.starts_with('.') {
            return Err(invalid("must not start with '.'"));
        }
        if let Some(c) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(invalid(&format!("character {c:?} is not allowed")));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Geometry ─────────────────────────────────────────────────────────────

/// Axis-aligned pixel box. Width and height are never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl BBox {
    /// Box used for regions whose raw coordinates could not be read.
    pub const ZERO: BBox = BBox {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    /// Build from a top-left and bottom-right corner, clamping degenerate
    /// extents to zero.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: x0.round() as i64,
            y: y0.round() as i64,
            width: (x1 - x0).max(0.0).round() as i64,
            height: (y1 - y0).max(0.0).round() as i64,
        }
    }
}

/// Reference size of the page image the block coordinates refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for PageSize {
    /// A4 rendered at 150 DPI.
    fn default() -> Self {
        Self {
            width: 1240,
            height: 1754,
        }
    }
}

// ── Blocks ───────────────────────────────────────────────────────────────

/// Canonical block kinds. Every raw label maps onto exactly one of these
/// (see [`crate::pipeline::labels`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Title,
    Text,
    Header,
    Footer,
    Figure,
    Table,
    Equation,
}

impl BlockType {
    pub const ALL: [BlockType; 7] = [
        BlockType::Title,
        BlockType::Text,
        BlockType::Header,
        BlockType::Footer,
        BlockType::Figure,
        BlockType::Table,
        BlockType::Equation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Title => "title",
            BlockType::Text => "text",
            BlockType::Header => "header",
            BlockType::Footer => "footer",
            BlockType::Figure => "figure",
            BlockType::Table => "table",
            BlockType::Equation => "equation",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of rich content as delivered by the layout model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Block content, classified once at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BlockContent {
    PlainText(String),
    RichText(Vec<Segment>),
    TableHtml(String),
}

impl Default for BlockContent {
    fn default() -> Self {
        BlockContent::PlainText(String::new())
    }
}

impl BlockContent {
    /// Flattened text of the block. Rich segments are joined with a single
    /// space; table HTML is returned verbatim.
    pub fn text(&self) -> String {
        match self {
            BlockContent::PlainText(s) | BlockContent::TableHtml(s) => s.clone(),
            BlockContent::RichText(segments) => segments
                .iter()
                .map(|s| s.text.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text().trim().is_empty()
    }
}

/// One detected region, normalized into an addressable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// `block_NNN`, 1-based by input position.
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub bbox: BBox,
    /// `None` when the model supplied no score for this block.
    pub confidence: Option<f64>,
    pub content: BlockContent,
    /// Set when a reviewer correction replaced the detected content.
    #[serde(default)]
    pub corrected: bool,
}

/// Format the identifier of the block at a 0-based position.
pub fn block_id(index: usize) -> String {
    format!("block_{:03}", index + 1)
}

/// Inverse of [`block_id`]: `block_003` → `Some(2)`.
pub fn block_index(id: &str) -> Option<usize> {
    let digits = id.strip_prefix("block_")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok()?.checked_sub(1)
}

// ── Raw layout snapshot (produced by the OCR collaborator) ───────────────

/// One raw region exactly as the layout model reported it.
///
/// `bbox` and `content` stay untyped here; the block builder decides their
/// shape once, tolerating malformed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRegion {
    #[serde(rename = "type", alias = "label", alias = "block_label", default)]
    pub label: String,
    #[serde(alias = "block_bbox", alias = "box", alias = "coordinate", default)]
    pub bbox: Value,
    #[serde(
        alias = "confidence",
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,
    #[serde(alias = "block_content", alias = "text", alias = "res", default)]
    pub content: Value,
}

/// Accept numbers and numeric strings; anything else counts as "no score".
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// The ordered region list for one job plus its page reference size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SnapshotRepr")]
pub struct LayoutSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub regions: Vec<RawRegion>,
}

impl LayoutSnapshot {
    pub fn new(regions: Vec<RawRegion>) -> Self {
        Self {
            width: None,
            height: None,
            regions,
        }
    }

    pub fn with_page_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotRepr {
    Bare(Vec<RawRegion>),
    Full {
        #[serde(alias = "image_width", alias = "imageWidth", default)]
        width: Option<u32>,
        #[serde(alias = "image_height", alias = "imageHeight", default)]
        height: Option<u32>,
        #[serde(
            alias = "blocks",
            alias = "parsing_res_list",
            alias = "layout",
            default
        )]
        regions: Vec<RawRegion>,
    },
}

impl From<SnapshotRepr> for LayoutSnapshot {
    fn from(repr: SnapshotRepr) -> Self {
        match repr {
            SnapshotRepr::Bare(regions) => LayoutSnapshot::new(regions),
            SnapshotRepr::Full {
                width,
                height,
                regions,
            } => LayoutSnapshot {
                width,
                height,
                regions,
            },
        }
    }
}

// ── Review records ───────────────────────────────────────────────────────

/// Reviewer override for one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    /// 0-based position in the layout (`block_001` is index 0).
    pub block_index: usize,
    #[serde(default)]
    pub original_text: String,
    pub corrected_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_html: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Latest correction per block index for one job. A mapping, not a log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionSet {
    pub job_id: JobId,
    #[serde(default)]
    pub corrections: BTreeMap<usize, Correction>,
}

impl CorrectionSet {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            corrections: BTreeMap::new(),
        }
    }

    /// Timestamp of the most recent correction, if any.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.corrections.values().map(|c| c.timestamp).max()
    }
}

/// One verification question and the opaque answer it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointResult {
    pub question: String,
    #[serde(default)]
    pub answer: Value,
}

/// Latest checkpoint snapshot of a job. Saving replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    pub job_id: JobId,
    pub results: Vec<CheckpointResult>,
    pub saved_at: DateTime<Utc>,
}

/// Terminal verdict of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Confirmed,
    Rejected,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Confirmed => f.write_str("confirmed"),
            ReviewStatus::Rejected => f.write_str("rejected"),
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" | "confirm" => Ok(ReviewStatus::Confirmed),
            "rejected" | "reject" => Ok(ReviewStatus::Rejected),
            other => Err(ReviewError::InvalidField {
                field: "status",
                reason: format!("expected 'confirmed' or 'rejected', got '{other}'"),
            }),
        }
    }
}

/// The job's latest submission. Overwritten by every submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub job_id: JobId,
    pub status: ReviewStatus,
    #[serde(default)]
    pub extracted_data: Value,
    #[serde(default)]
    pub checkpoint_results: Vec<CheckpointResult>,
    #[serde(default)]
    pub corrections: Vec<Correction>,
    #[serde(default)]
    pub filename: String,
    pub saved_at: DateTime<Utc>,
}

/// Reviewer-edited Markdown that supersedes the rendered projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMarkdown {
    pub job_id: JobId,
    pub markdown: String,
    pub saved_at: DateTime<Utc>,
}
