//! Readiness derivation
//!
//! `compute` folds the persisted facts about a media buy into one
//! `ReadinessDetails` snapshot. The derivation order is load-bearing:
//! rules are evaluated top-down and the first match wins.
//!
//! 1. persisted `failed` wins over everything
//! 2. persisted `paused`
//! 3. flight window already closed
//! 4. no packages configured
//! 5. blocked on creatives (rejected, unassigned packages, or none synced)
//! 6. fully approved, flight not yet open
//! 7. fully approved, inside the flight window
//! 8. fallback: draft
//!
//! The function is total and read-only. A `failed` readiness state is a
//! diagnostic, not an error; there is nothing here to propagate.

use crate::state::{ReadinessDetails, ReadinessState};
use buyline_types::{
    Creative, CreativeAssignment, CreativeId, CreativeStatus, MediaBuy, MediaBuyId,
    MediaBuyStatus, PackageRequest,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Derive the operational state of a media buy at `now`.
pub fn compute(
    buy: &MediaBuy,
    packages: &[PackageRequest],
    assignments: &[CreativeAssignment],
    creatives: &[Creative],
    now: DateTime<Utc>,
) -> ReadinessDetails {
    let warnings = pending_warnings(creatives);
    let package_count = packages.len();
    let creative_count = creatives.len();

    let snapshot = |state: ReadinessState, blocking: Vec<String>, ready: bool| ReadinessDetails {
        state,
        is_ready_to_activate: ready,
        package_count,
        creative_count,
        blocking_issues: blocking,
        warnings: warnings.clone(),
    };

    if buy.status == MediaBuyStatus::Failed {
        let issue = format!("media buy {} is in failed status", buy.id);
        return snapshot(ReadinessState::Failed, vec![issue], false);
    }

    if buy.status == MediaBuyStatus::Paused {
        return snapshot(ReadinessState::Paused, Vec::new(), false);
    }

    if buy.flight.has_ended(now) {
        return snapshot(ReadinessState::Completed, Vec::new(), false);
    }

    if packages.is_empty() {
        return snapshot(ReadinessState::Draft, Vec::new(), false);
    }

    let by_id: HashMap<&CreativeId, &Creative> = creatives.iter().map(|c| (&c.id, c)).collect();
    let blocking = blocking_issues(packages, assignments, creatives);

    if !blocking.is_empty() {
        let in_review = creatives
            .iter()
            .any(|c| c.status == CreativeStatus::Pending);
        let state = if in_review {
            ReadinessState::NeedsApproval
        } else {
            ReadinessState::NeedsCreatives
        };
        return snapshot(state, blocking, false);
    }

    let all_approved = assignments.iter().all(|a| {
        by_id
            .get(&a.creative_id)
            .map(|c| c.status == CreativeStatus::Approved)
            .unwrap_or(false)
    });

    if all_approved && !buy.flight.has_started(now) {
        return snapshot(ReadinessState::Scheduled, Vec::new(), true);
    }

    if all_approved && buy.flight.contains(now) {
        return snapshot(ReadinessState::Live, Vec::new(), false);
    }

    snapshot(ReadinessState::Draft, Vec::new(), false)
}

/// Snapshot for a media buy that could not be loaded at all.
pub fn compute_missing(media_buy_id: &MediaBuyId) -> ReadinessDetails {
    ReadinessDetails {
        state: ReadinessState::Failed,
        is_ready_to_activate: false,
        package_count: 0,
        creative_count: 0,
        blocking_issues: vec![format!("media buy {media_buy_id} not found")],
        warnings: Vec::new(),
    }
}

/// Whether the buy's creative set clears the activation gate: creatives
/// exist, every package has an assignment, and every assignment points
/// at an approved creative.
///
/// Used by the approval path to choose between going live and holding
/// the buy back for more creative work.
pub fn creatives_ready(
    packages: &[PackageRequest],
    assignments: &[CreativeAssignment],
    creatives: &[Creative],
) -> bool {
    if packages.is_empty() || creatives.is_empty() {
        return false;
    }
    let by_id: HashMap<&CreativeId, &Creative> = creatives.iter().map(|c| (&c.id, c)).collect();
    let every_package_assigned = packages.iter().all(|pkg| {
        assignments
            .iter()
            .any(|a| a.package_id == pkg.package_id)
    });
    let every_assignment_approved = assignments.iter().all(|a| {
        by_id
            .get(&a.creative_id)
            .map(|c| c.status == CreativeStatus::Approved)
            .unwrap_or(false)
    });
    every_package_assigned && every_assignment_approved
}

fn blocking_issues(
    packages: &[PackageRequest],
    assignments: &[CreativeAssignment],
    creatives: &[Creative],
) -> Vec<String> {
    let mut issues = Vec::new();

    if creatives.is_empty() {
        issues.push("no creatives have been synced for this media buy".to_string());
    }

    for pkg in packages {
        let assigned = assignments
            .iter()
            .any(|a| a.package_id == pkg.package_id);
        if !assigned {
            issues.push(format!("package {} has no creative assigned", pkg.package_id));
        }
    }

    for creative in creatives {
        if creative.status != CreativeStatus::Rejected {
            continue;
        }
        let assigned = assignments.iter().any(|a| a.creative_id == creative.id);
        if assigned {
            issues.push(format!("creative {} is rejected", creative.id));
        }
    }

    issues
}

fn pending_warnings(creatives: &[Creative]) -> Vec<String> {
    creatives
        .iter()
        .filter(|c| c.status == CreativeStatus::Pending)
        .map(|c| format!("creative {} is pending review", c.id))
        .collect()
}
