//! Client-facing read and acknowledgement payloads.
//!
//! All of them serialize with camelCase field names. Reads of an unknown job
//! still produce a well-formed value of these types (empty lists, `None`
//! timestamps), never an error.

use crate::model::{Block, CheckpointResult, Correction, JobId};
use crate::pipeline::Anchor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blocks of a job plus the page reference size they are measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutView {
    pub job_id: JobId,
    pub blocks: Vec<Block>,
    pub image_width: u32,
    pub image_height: u32,
}

/// Where a [`MarkdownView`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownSource {
    /// Projected from layout + corrections.
    Rendered,
    /// Reviewer-saved text, returned verbatim.
    Saved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownView {
    pub job_id: JobId,
    pub markdown: String,
    /// Anchors in document order. For saved Markdown they are re-parsed from
    /// the text, so edited or deleted anchor lines show up here.
    pub anchors: Vec<Anchor>,
    pub source: MarkdownSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAck {
    pub job_id: JobId,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionAck {
    pub job_id: JobId,
    pub block_index: usize,
    /// An earlier correction at the same index was overwritten.
    pub replaced: bool,
    /// Corrected block indices for the job after this write.
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionList {
    pub job_id: JobId,
    /// Ordered by block index.
    pub corrections: Vec<Correction>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointView {
    pub job_id: JobId,
    pub results: Vec<CheckpointResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn views_use_camel_case() {
        let view = LayoutView {
            job_id: JobId::parse("j").unwrap(),
            blocks: vec![],
            image_width: 1240,
            image_height: 1754,
        };
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(
            v,
            json!({"jobId": "j", "blocks": [], "imageWidth": 1240, "imageHeight": 1754})
        );
    }

    #[test]
    fn unsaved_checkpoint_view_omits_timestamp() {
        let view = CheckpointView {
            job_id: JobId::parse("j").unwrap(),
            results: vec![],
            saved_at: None,
        };
        let v = serde_json::to_value(&view).unwrap();
        assert!(v.get("savedAt").is_none());
        assert_eq!(v["results"], json!([]));
    }
}
