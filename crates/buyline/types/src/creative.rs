//! Creative assets and their package assignments

use crate::ids::{CreativeId, MediaBuyId, PrincipalId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review status of a creative asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeStatus {
    /// Uploaded, waiting on publisher review
    Pending,
    Approved,
    Rejected,
}

impl CreativeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreativeStatus::Pending => "pending",
            CreativeStatus::Approved => "approved",
            CreativeStatus::Rejected => "rejected",
        }
    }

    pub fn parse_str(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(CreativeStatus::Pending),
            "approved" => Some(CreativeStatus::Approved),
            "rejected" => Some(CreativeStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for CreativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creative asset owned by a principal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creative {
    pub id: CreativeId,
    pub tenant_id: TenantId,
    pub principal_id: PrincipalId,
    pub name: String,
    /// Declared format, matched against package format lists.
    pub format: String,
    pub status: CreativeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assignment of a creative to one package of a media buy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeAssignment {
    pub media_buy_id: MediaBuyId,
    pub package_id: String,
    pub creative_id: CreativeId,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creative_status_round_trip() {
        for status in [
            CreativeStatus::Pending,
            CreativeStatus::Approved,
            CreativeStatus::Rejected,
        ] {
            assert_eq!(CreativeStatus::parse_str(status.as_str()), Some(status));
        }
        assert_eq!(CreativeStatus::parse_str("live"), None);
    }
}
