//! Error types for the layout-review library.
//!
//! Everything fallible returns [`ReviewError`]. Each variant belongs to one of
//! two categories, exposed through [`ReviewError::category`]:
//!
//! * **Validation** — the request itself is wrong (missing field, bad job ID).
//!   Raised at the boundary before any store is touched, so nothing is
//!   persisted.
//!
//! * **System** — the persistence medium failed or returned something
//!   unreadable. Fatal for the request and never retried here; retry policy
//!   belongs to the caller.
//!
//! Reading a job that has no records is not an error at all: every read
//! operation returns a well-formed empty payload instead.
//!
//! Malformed upstream layout data is not an error either. A bad region
//! degrades to a zero-sized box (see [`crate::pipeline::blocks`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the layout-review library.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// A write request omitted a field the operation cannot do without.
    #[error("Missing required field '{field}'")]
    MissingField { field: &'static str },

    /// A field was present but its value is unusable.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The job identifier cannot be used as a storage key.
    #[error("Invalid job id '{job_id}': {reason}")]
    InvalidJobId { job_id: String, reason: String },

    // ── Persistence errors ────────────────────────────────────────────────
    /// Reading a persisted record failed for a reason other than absence.
    #[error("Failed to read '{path}': {source}")]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a record (or its parent directory) failed.
    #[error("Failed to write '{path}': {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted record exists but does not deserialize.
    #[error("Stored record '{key}' is unreadable: {detail}")]
    CorruptRecord { key: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error class reported to calling clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// The caller sent something unusable; nothing was persisted.
    Validation,
    /// Storage or internal failure; the request did not complete.
    System,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => f.write_str("validation"),
            ErrorCategory::System => f.write_str("system"),
        }
    }
}

/// Structured error payload handed back to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub category: ErrorCategory,
    pub message: String,
}

impl ReviewError {
    /// Which side of the boundary caused the failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReviewError::MissingField { .. }
            | ReviewError::InvalidField { .. }
            | ReviewError::InvalidJobId { .. } => ErrorCategory::Validation,
            ReviewError::StorageRead { .. }
            | ReviewError::StorageWrite { .. }
            | ReviewError::CorruptRecord { .. }
            | ReviewError::InvalidConfig(_)
            | ReviewError::Internal(_) => ErrorCategory::System,
        }
    }

    /// True for errors raised before any store was touched.
    pub fn is_validation(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }

    /// Render the error as a client-facing payload.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            category: self.category(),
            message: self.to_string(),
        }
    }
}
