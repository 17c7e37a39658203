//! Media buy records and their operational lifecycle
//!
//! A media buy moves through a single persisted status field. Draft and
//! approval states are driven by the workflow engine; scheduled, active,
//! and completed are flight sub-states derived from the flight window.

use crate::ids::{MediaBuyId, PrincipalId, TenantId};
use crate::request::MediaBuyRequest;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted operational status of a media buy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaBuyStatus {
    /// Created but not yet runnable (no packages, or creatives missing)
    Draft,
    /// Waiting on a human decision before the buy can proceed
    PendingApproval,
    /// Fully approved, flight window has not opened yet
    Scheduled,
    /// Delivering inside the flight window
    Active,
    /// Operationally paused by an operator
    Paused,
    /// Flight window has closed
    Completed,
    /// An external operation failed and the buy needs intervention
    Failed,
    /// A human rejected the buy
    Rejected,
}

impl MediaBuyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaBuyStatus::Draft => "draft",
            MediaBuyStatus::PendingApproval => "pending_approval",
            MediaBuyStatus::Scheduled => "scheduled",
            MediaBuyStatus::Active => "active",
            MediaBuyStatus::Paused => "paused",
            MediaBuyStatus::Completed => "completed",
            MediaBuyStatus::Failed => "failed",
            MediaBuyStatus::Rejected => "rejected",
        }
    }

    pub fn parse_str(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(MediaBuyStatus::Draft),
            "pending_approval" => Some(MediaBuyStatus::PendingApproval),
            "scheduled" => Some(MediaBuyStatus::Scheduled),
            "active" => Some(MediaBuyStatus::Active),
            "paused" => Some(MediaBuyStatus::Paused),
            "completed" => Some(MediaBuyStatus::Completed),
            "failed" => Some(MediaBuyStatus::Failed),
            "rejected" => Some(MediaBuyStatus::Rejected),
            _ => None,
        }
    }

    /// Terminal states never transition again without manual repair.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MediaBuyStatus::Completed | MediaBuyStatus::Failed | MediaBuyStatus::Rejected
        )
    }

    /// Flight sub-states derived from the flight window once a buy is approved.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            MediaBuyStatus::Scheduled | MediaBuyStatus::Active | MediaBuyStatus::Completed
        )
    }
}

impl fmt::Display for MediaBuyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery window for a media buy.
///
/// Dates are always present; precise timestamps are optional and take
/// precedence over the date bounds when supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl FlightWindow {
    pub fn from_dates(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            start_time: None,
            end_time: None,
        }
    }

    /// Instant at which delivery begins: the precise start if given,
    /// otherwise midnight UTC on the start date.
    pub fn start_instant(&self) -> DateTime<Utc> {
        match self.start_time {
            Some(ts) => ts,
            None => self.start_date.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_instant()
    }

    /// Whether the window has closed. With a precise end the window is
    /// over once `now` passes it; with a date-only end the entire end
    /// day remains in flight.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        match self.end_time {
            Some(ts) => now > ts,
            None => {
                let next_day = self
                    .end_date
                    .checked_add_days(Days::new(1))
                    .unwrap_or(self.end_date);
                now >= next_day.and_time(NaiveTime::MIN).and_utc()
            }
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.has_started(now) && !self.has_ended(now)
    }

    /// A window is well-formed when it does not end before it starts.
    pub fn is_well_formed(&self) -> bool {
        if self.end_date < self.start_date {
            return false;
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end >= start,
            _ => true,
        }
    }
}

/// Persistent media buy record. The single source of truth for the
/// buy's operational state is the `status` field in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaBuy {
    pub id: MediaBuyId,
    pub tenant_id: TenantId,
    pub principal_id: PrincipalId,
    /// Buyer-supplied reference, echoed back in result payloads.
    pub buyer_ref: String,
    pub status: MediaBuyStatus,
    pub flight: FlightWindow,
    pub budget: f64,
    /// Order identifier on the external ad server, once one exists.
    pub external_order_id: Option<String>,
    /// Original intake request, retained for manual replay.
    pub request: MediaBuyRequest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaBuy {
    /// Build a fresh draft record from an intake request.
    pub fn from_request(
        tenant_id: TenantId,
        principal_id: PrincipalId,
        request: MediaBuyRequest,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MediaBuyId::generate(),
            tenant_id,
            principal_id,
            buyer_ref: request.buyer_ref.clone(),
            status: MediaBuyStatus::Draft,
            flight: request.flight.clone(),
            budget: request.budget,
            external_order_id: None,
            request,
            created_at: now,
            updated_at: now,
        }
    }

    /// The flight sub-state this buy belongs in at `now`, ignoring
    /// approval and pause gating.
    pub fn flight_status(&self, now: DateTime<Utc>) -> MediaBuyStatus {
        if self.flight.has_ended(now) {
            MediaBuyStatus::Completed
        } else if self.flight.has_started(now) {
            MediaBuyStatus::Active
        } else {
            MediaBuyStatus::Scheduled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            MediaBuyStatus::Draft,
            MediaBuyStatus::PendingApproval,
            MediaBuyStatus::Scheduled,
            MediaBuyStatus::Active,
            MediaBuyStatus::Paused,
            MediaBuyStatus::Completed,
            MediaBuyStatus::Failed,
            MediaBuyStatus::Rejected,
        ] {
            assert_eq!(MediaBuyStatus::parse_str(status.as_str()), Some(status));
        }
        assert_eq!(MediaBuyStatus::parse_str("live"), None);
    }

    #[test]
    fn test_end_day_is_in_flight_for_date_only_windows() {
        let window = FlightWindow::from_dates(date(2025, 6, 1), date(2025, 6, 10));
        let late_on_end_day = Utc.with_ymd_and_hms(2025, 6, 10, 23, 0, 0).unwrap();
        let next_morning = Utc.with_ymd_and_hms(2025, 6, 11, 0, 0, 1).unwrap();
        assert!(window.contains(late_on_end_day));
        assert!(window.has_ended(next_morning));
    }

    #[test]
    fn test_precise_times_take_precedence() {
        let mut window = FlightWindow::from_dates(date(2025, 6, 1), date(2025, 6, 10));
        window.end_time = Some(Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap());
        let afternoon = Utc.with_ymd_and_hms(2025, 6, 10, 13, 0, 0).unwrap();
        assert!(window.has_ended(afternoon));
    }

    #[test]
    fn test_window_well_formed() {
        let forward = FlightWindow::from_dates(date(2025, 6, 1), date(2025, 6, 10));
        let backward = FlightWindow::from_dates(date(2025, 6, 10), date(2025, 6, 1));
        assert!(forward.is_well_formed());
        assert!(!backward.is_well_formed());
    }
}
