//! Client write payloads.
//!
//! Every field is optional on the wire so a missing field surfaces as a
//! [`ReviewError::MissingField`] validation error rather than a serde failure.
//! Validation runs before any store is touched.

use crate::error::ReviewError;
use crate::model::{block_index, CheckpointResult, Correction, ReviewStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upsert of one block correction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    /// 0-based block position.
    pub block_index: Option<i64>,
    /// Alternative addressing by block ID (`block_003` is index 2).
    pub block_id: Option<String>,
    pub original_text: Option<String>,
    pub corrected_text: Option<String>,
    pub table_html: Option<String>,
}

impl CorrectionRequest {
    /// Check the request and resolve the 0-based block index it targets.
    pub fn validate(&self) -> Result<usize, ReviewError> {
        let from_id = match self.block_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => {
                Some(block_index(id).ok_or_else(|| ReviewError::InvalidField {
                    field: "blockId",
                    reason: format!("'{id}' is not of the form block_NNN"),
                })?)
            }
            _ => None,
        };
        let from_index = match self.block_index {
            Some(i) if i < 0 => {
                return Err(ReviewError::InvalidField {
                    field: "blockIndex",
                    reason: format!("must not be negative, got {i}"),
                })
            }
            Some(i) => Some(usize::try_from(i).map_err(|_| ReviewError::InvalidField {
                field: "blockIndex",
                reason: format!("{i} is out of range"),
            })?),
            None => None,
        };

        let index = match (from_index, from_id) {
            (Some(a), Some(b)) if a != b => {
                return Err(ReviewError::InvalidField {
                    field: "blockId",
                    reason: format!("refers to index {b} but blockIndex is {a}"),
                })
            }
            (Some(i), _) | (None, Some(i)) => i,
            (None, None) => return Err(ReviewError::MissingField { field: "blockIndex" }),
        };

        if self.corrected_text.is_none() {
            return Err(ReviewError::MissingField {
                field: "correctedText",
            });
        }
        Ok(index)
    }

    /// Validate and stamp into a storable [`Correction`].
    pub fn into_correction(self, timestamp: DateTime<Utc>) -> Result<Correction, ReviewError> {
        let block_index = self.validate()?;
        Ok(Correction {
            block_index,
            original_text: self.original_text.unwrap_or_default(),
            corrected_text: self.corrected_text.unwrap_or_default(),
            table_html: self.table_html.filter(|h| !h.trim().is_empty()),
            timestamp,
        })
    }
}

/// One checkpoint answer as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointAnswer {
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Value,
}

/// Full replacement of a job's checkpoint results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRequest {
    pub results: Option<Vec<CheckpointAnswer>>,
}

impl CheckpointRequest {
    pub fn validate(self) -> Result<Vec<CheckpointResult>, ReviewError> {
        let results = self
            .results
            .ok_or(ReviewError::MissingField { field: "results" })?;
        results
            .into_iter()
            .enumerate()
            .map(|(i, r)| match r.question {
                Some(q) if !q.trim().is_empty() => Ok(CheckpointResult {
                    question: q,
                    answer: r.answer,
                }),
                _ => Err(ReviewError::InvalidField {
                    field: "results",
                    reason: format!("result {i} has no question"),
                }),
            })
            .collect()
    }
}

/// Confirm or reject a job.
///
/// Omitted `checkpointResults` / `corrections` are filled from the stores at
/// submission time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub status: Option<String>,
    pub extracted_data: Option<Value>,
    pub checkpoint_results: Option<Vec<CheckpointResult>>,
    pub corrections: Option<Vec<Correction>>,
    pub filename: Option<String>,
}

impl SubmitRequest {
    pub fn validate(&self) -> Result<ReviewStatus, ReviewError> {
        match self.status.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse(),
            _ => Err(ReviewError::MissingField { field: "status" }),
        }
    }
}

/// Replacement of the job's editable Markdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveMarkdownRequest {
    pub markdown: Option<String>,
}

impl SaveMarkdownRequest {
    /// An empty document is accepted; only absence is refused.
    pub fn validate(self) -> Result<String, ReviewError> {
        self.markdown
            .ok_or(ReviewError::MissingField { field: "markdown" })
    }
}
