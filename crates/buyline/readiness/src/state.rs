//! Derived readiness vocabulary
//!
//! Readiness states are a read-only diagnostic over persisted facts.
//! They overlap with persisted media buy statuses but are not the same
//! vocabulary: `live`, `needs_creatives`, and `needs_approval` exist
//! only here and are never written back to the store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational state derived for a media buy at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// Not yet runnable; nothing is blocking but nothing is ready either
    Draft,
    /// At least one package is missing an approved creative
    NeedsCreatives,
    /// Blocked, and at least one creative is still in review
    NeedsApproval,
    /// Fully stocked with approved creatives, flight not yet open
    Scheduled,
    /// Delivering inside the flight window
    Live,
    Paused,
    Completed,
    Failed,
}

impl ReadinessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessState::Draft => "draft",
            ReadinessState::NeedsCreatives => "needs_creatives",
            ReadinessState::NeedsApproval => "needs_approval",
            ReadinessState::Scheduled => "scheduled",
            ReadinessState::Live => "live",
            ReadinessState::Paused => "paused",
            ReadinessState::Completed => "completed",
            ReadinessState::Failed => "failed",
        }
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a media buy's derived state.
///
/// Recomputed on every query and never cached across mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessDetails {
    pub state: ReadinessState,
    pub is_ready_to_activate: bool,
    pub package_count: usize,
    pub creative_count: usize,
    /// Conditions that prevent the buy from going live.
    pub blocking_issues: Vec<String>,
    /// Non-blocking conditions worth surfacing, e.g. creatives in review.
    pub warnings: Vec<String>,
}

impl ReadinessDetails {
    pub fn is_blocked(&self) -> bool {
        !self.blocking_issues.is_empty()
    }
}
