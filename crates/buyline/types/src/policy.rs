//! Product-level automation policy inputs
//!
//! Each package in a media buy carries a product configuration. The
//! configuration names an automation preference, and the ad server
//! adapter classifies the product into a line-item class. Both feed the
//! policy resolver that picks the buy-level automation mode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of order creation and activation runs without a human
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutomationMode {
    /// Create and activate the order with no human involvement
    Automatic,
    /// Create the order, then hold activation for a human decision
    ConfirmationRequired,
    /// Never touch the ad server; a human performs every operation
    #[default]
    Manual,
}

impl AutomationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationMode::Automatic => "automatic",
            AutomationMode::ConfirmationRequired => "confirmation_required",
            AutomationMode::Manual => "manual",
        }
    }

    pub fn parse_str(raw: &str) -> Option<Self> {
        match raw {
            "automatic" => Some(AutomationMode::Automatic),
            "confirmation_required" => Some(AutomationMode::ConfirmationRequired),
            "manual" => Some(AutomationMode::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for AutomationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Commercial class of the line item a package maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemClass {
    /// Reserved inventory with a delivery commitment
    Guaranteed,
    /// Best-effort inventory with no delivery commitment
    NonGuaranteed,
}

impl LineItemClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemClass::Guaranteed => "guaranteed",
            LineItemClass::NonGuaranteed => "non_guaranteed",
        }
    }
}

impl fmt::Display for LineItemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publisher-side product configuration attached to a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    pub product_id: String,
    /// Ad-server line item type, e.g. `standard` or `price_priority`.
    pub line_item_type: String,
    /// Automation preference for buys landing on this product.
    #[serde(default)]
    pub automation: AutomationMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automation_mode_round_trip() {
        for mode in [
            AutomationMode::Automatic,
            AutomationMode::ConfirmationRequired,
            AutomationMode::Manual,
        ] {
            assert_eq!(AutomationMode::parse_str(mode.as_str()), Some(mode));
        }
        assert_eq!(AutomationMode::parse_str("auto"), None);
    }

    #[test]
    fn test_automation_defaults_to_manual() {
        let raw = r#"{"product_id": "p-1", "line_item_type": "standard"}"#;
        let config: ProductConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.automation, AutomationMode::Manual);
    }
}
