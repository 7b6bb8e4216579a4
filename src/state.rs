//! Job review state machine.
//!
//! ```text
//! Created ──LayoutArrived──▶ LayoutReady ──Corrected/MarkdownSaved──▶ Correcting
//!                                                   ▲        │
//!                                                   │        ▼ CheckpointSaved
//!                                                   └── Checkpointed
//!            any state ──Submitted(status)──▶ Submitted{Confirmed|Rejected}
//!            Submitted ──Corrected/CheckpointSaved──▶ back into the loop
//! ```
//!
//! The state is never stored. [`derive`] recomputes it by folding
//! [`ReviewState::on`] over the job's activity as recorded in the stores, so
//! it cannot drift from the data it describes.

use crate::model::ReviewStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "status", rename_all = "snake_case")]
pub enum ReviewState {
    /// Job known, no layout yet.
    #[default]
    Created,
    LayoutReady,
    /// At least one correction or Markdown save since the last checkpoint.
    Correcting,
    Checkpointed,
    /// Latest submission and its verdict. Editing stays permitted.
    Submitted(ReviewStatus),
}

/// Something that happened to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    LayoutArrived,
    Corrected,
    MarkdownSaved,
    CheckpointSaved,
    Submitted(ReviewStatus),
}

impl ReviewState {
    /// Total transition function.
    pub fn on(self, event: ReviewEvent) -> ReviewState {
        match (self, event) {
            (ReviewState::Created, ReviewEvent::LayoutArrived) => ReviewState::LayoutReady,
            // A re-delivered layout does not reset review progress.
            (state, ReviewEvent::LayoutArrived) => state,
            (_, ReviewEvent::Corrected | ReviewEvent::MarkdownSaved) => ReviewState::Correcting,
            (_, ReviewEvent::CheckpointSaved) => ReviewState::Checkpointed,
            (_, ReviewEvent::Submitted(status)) => ReviewState::Submitted(status),
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, ReviewState::Submitted(_))
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewState::Created => f.write_str("created"),
            ReviewState::LayoutReady => f.write_str("layout_ready"),
            ReviewState::Correcting => f.write_str("correcting"),
            ReviewState::Checkpointed => f.write_str("checkpointed"),
            ReviewState::Submitted(status) => write!(f, "submitted ({status})"),
        }
    }
}

/// A job's recorded activity, gathered from the stores.
#[derive(Debug, Clone, Default)]
pub struct JobActivity {
    /// Whether a layout snapshot exists. Layouts carry no timestamp and are
    /// always treated as the first event.
    pub layout: bool,
    events: Vec<(DateTime<Utc>, ReviewEvent)>,
}

impl JobActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, present: bool) -> Self {
        self.layout = present;
        self
    }

    /// Record a timestamped event.
    pub fn record(&mut self, at: DateTime<Utc>, event: ReviewEvent) {
        self.events.push((at, event));
    }

    pub fn is_empty(&self) -> bool {
        !self.layout && self.events.is_empty()
    }
}

/// Current state of a job: fold of its events in timestamp order.
///
/// Ties keep recording order (the sort is stable).
pub fn derive(activity: &JobActivity) -> ReviewState {
    let mut events = activity.events.clone();
    events.sort_by_key(|(at, _)| *at);

    let start = if activity.layout {
        ReviewState::Created.on(ReviewEvent::LayoutArrived)
    } else {
        ReviewState::Created
    };
    events
        .into_iter()
        .fold(start, |state, (_, event)| state.on(event))
}
