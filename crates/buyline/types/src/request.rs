//! Intake request payloads
//!
//! The request types mirror what a buyer submits over the wire. The full
//! request is retained verbatim on the media buy record so a manual-task
//! step can replay it for a human operator.

use crate::media_buy::FlightWindow;
use crate::policy::ProductConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One package inside a media buy request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRequest {
    /// Buyer-visible package identifier, unique within the request.
    pub package_id: String,
    pub name: String,
    /// Impression goal for the package.
    pub impressions: i64,
    /// Rate in CPM for the package.
    pub cpm: f64,
    pub product: ProductConfig,
    /// Creative formats the package will accept.
    #[serde(default)]
    pub formats: Vec<String>,
    /// Opaque targeting expression, passed through to the ad server.
    #[serde(default)]
    pub targeting: Value,
}

impl PackageRequest {
    pub fn summary(&self) -> PackageSummary {
        PackageSummary {
            package_id: self.package_id.clone(),
            name: self.name.clone(),
            impressions: self.impressions,
            rate: self.cpm,
        }
    }
}

/// Condensed package view embedded in approval payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub package_id: String,
    pub name: String,
    pub impressions: i64,
    pub rate: f64,
}

/// Buyer-supplied webhook target for status pushes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

/// Full media buy intake request as submitted by a buyer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaBuyRequest {
    /// Buyer's own reference for this buy.
    pub buyer_ref: String,
    pub budget: f64,
    pub flight: FlightWindow,
    pub packages: Vec<PackageRequest>,
    /// Optional webhook to push status changes back to the buyer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<PushConfig>,
}

impl MediaBuyRequest {
    pub fn package_summaries(&self) -> Vec<PackageSummary> {
        self.packages.iter().map(PackageRequest::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AutomationMode;
    use chrono::NaiveDate;

    fn sample_request() -> MediaBuyRequest {
        MediaBuyRequest {
            buyer_ref: "po-4711".to_string(),
            budget: 25_000.0,
            flight: FlightWindow::from_dates(
                NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
            ),
            packages: vec![PackageRequest {
                package_id: "pkg-1".to_string(),
                name: "Homepage takeover".to_string(),
                impressions: 1_000_000,
                cpm: 12.5,
                product: ProductConfig {
                    product_id: "prod-home".to_string(),
                    line_item_type: "standard".to_string(),
                    automation: AutomationMode::Automatic,
                },
                formats: vec!["display_970x250".to_string()],
                targeting: Value::Null,
            }],
            push: None,
        }
    }

    #[test]
    fn test_request_survives_json_round_trip() {
        let request = sample_request();
        let raw = serde_json::to_string(&request).unwrap();
        let parsed: MediaBuyRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_package_summary_carries_rate() {
        let request = sample_request();
        let summaries = request.package_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Homepage takeover");
        assert_eq!(summaries[0].impressions, 1_000_000);
        assert!((summaries[0].rate - 12.5).abs() < f64::EPSILON);
    }
}
