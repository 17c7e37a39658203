//! Automation policy resolver
//!
//! Decides, once per intake, how much of a media buy's order lifecycle
//! may run without a human. The resolution is a pure function of the
//! packages in the request: the store is never consulted and the same
//! inputs always produce the same mode.
//!
//! Rules, in order:
//! 1. Any guaranteed package forces manual handling for the whole buy.
//!    Reserved inventory carries a delivery commitment, so a human
//!    stays in the loop no matter what the products prefer.
//! 2. Otherwise the first package's preference wins. Preferences of the
//!    remaining packages are recorded, and a divergence is logged as a
//!    warning.

use crate::error::{PolicyError, Result};
use buyline_types::{AutomationMode, LineItemClass};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Per-package input to the resolver.
///
/// Built by intake from the package's product configuration and the ad
/// server adapter's line-item classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagePolicyInput {
    pub package_id: String,
    pub class: LineItemClass,
    pub preference: AutomationMode,
}

/// Why the resolver picked the mode it picked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionReason {
    /// At least one package maps to guaranteed inventory
    GuaranteedInventory,
    /// No guaranteed packages; the first package's preference applied
    PackagePreference,
}

/// Recorded outcome of one automation resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationResolution {
    pub mode: AutomationMode,
    pub reason: ResolutionReason,
    /// Package whose class or preference determined the mode.
    pub deciding_package: String,
    /// Packages whose preference differs from the resolved mode.
    pub divergent_packages: Vec<String>,
}

impl AutomationResolution {
    pub fn is_divergent(&self) -> bool {
        !self.divergent_packages.is_empty()
    }
}

/// Resolve the buy-level automation mode from its packages.
///
/// Returns an error only when the package list is empty; every
/// non-empty input resolves.
pub fn resolve_automation(packages: &[PackagePolicyInput]) -> Result<AutomationResolution> {
    let first = packages.first().ok_or(PolicyError::NoPackages)?;

    let resolution = match packages
        .iter()
        .find(|p| p.class == LineItemClass::Guaranteed)
    {
        Some(guaranteed) => AutomationResolution {
            mode: AutomationMode::Manual,
            reason: ResolutionReason::GuaranteedInventory,
            deciding_package: guaranteed.package_id.clone(),
            divergent_packages: divergent_from(packages, AutomationMode::Manual),
        },
        None => AutomationResolution {
            mode: first.preference,
            reason: ResolutionReason::PackagePreference,
            deciding_package: first.package_id.clone(),
            divergent_packages: divergent_from(packages, first.preference),
        },
    };

    log_resolution(&resolution);
    Ok(resolution)
}

fn divergent_from(packages: &[PackagePolicyInput], mode: AutomationMode) -> Vec<String> {
    packages
        .iter()
        .filter(|p| p.preference != mode)
        .map(|p| p.package_id.clone())
        .collect()
}

fn log_resolution(resolution: &AutomationResolution) {
    if resolution.is_divergent() {
        warn!(
            mode = %resolution.mode,
            deciding_package = %resolution.deciding_package,
            divergent = ?resolution.divergent_packages,
            "Automation preferences diverge across packages"
        );
    } else {
        info!(
            mode = %resolution.mode,
            deciding_package = %resolution.deciding_package,
            "Resolved automation mode"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn package(
        id: &str,
        class: LineItemClass,
        preference: AutomationMode,
    ) -> PackagePolicyInput {
        PackagePolicyInput {
            package_id: id.to_string(),
            class,
            preference,
        }
    }

    #[test]
    fn test_empty_buy_is_an_error() {
        assert_eq!(resolve_automation(&[]), Err(PolicyError::NoPackages));
    }

    #[test]
    fn test_guaranteed_package_forces_manual() {
        let packages = vec![
            package(
                "pkg-1",
                LineItemClass::NonGuaranteed,
                AutomationMode::Automatic,
            ),
            package("pkg-2", LineItemClass::Guaranteed, AutomationMode::Automatic),
        ];
        let resolution = resolve_automation(&packages).unwrap();
        assert_eq!(resolution.mode, AutomationMode::Manual);
        assert_eq!(resolution.reason, ResolutionReason::GuaranteedInventory);
        assert_eq!(resolution.deciding_package, "pkg-2");
    }

    #[test]
    fn test_first_preference_wins_without_guaranteed() {
        let packages = vec![
            package(
                "pkg-1",
                LineItemClass::NonGuaranteed,
                AutomationMode::ConfirmationRequired,
            ),
            package(
                "pkg-2",
                LineItemClass::NonGuaranteed,
                AutomationMode::Automatic,
            ),
        ];
        let resolution = resolve_automation(&packages).unwrap();
        assert_eq!(resolution.mode, AutomationMode::ConfirmationRequired);
        assert_eq!(resolution.reason, ResolutionReason::PackagePreference);
        assert_eq!(resolution.deciding_package, "pkg-1");
        assert_eq!(resolution.divergent_packages, vec!["pkg-2".to_string()]);
    }

    #[test]
    fn test_agreeing_packages_record_no_divergence() {
        let packages = vec![
            package(
                "pkg-1",
                LineItemClass::NonGuaranteed,
                AutomationMode::Automatic,
            ),
            package(
                "pkg-2",
                LineItemClass::NonGuaranteed,
                AutomationMode::Automatic,
            ),
        ];
        let resolution = resolve_automation(&packages).unwrap();
        assert_eq!(resolution.mode, AutomationMode::Automatic);
        assert!(!resolution.is_divergent());
    }

    fn mode_strategy() -> impl Strategy<Value = AutomationMode> {
        prop_oneof![
            Just(AutomationMode::Automatic),
            Just(AutomationMode::ConfirmationRequired),
            Just(AutomationMode::Manual),
        ]
    }

    fn class_strategy() -> impl Strategy<Value = LineItemClass> {
        prop_oneof![
            Just(LineItemClass::Guaranteed),
            Just(LineItemClass::NonGuaranteed),
        ]
    }

    fn packages_strategy() -> impl Strategy<Value = Vec<PackagePolicyInput>> {
        proptest::collection::vec(
            (0u32..100, class_strategy(), mode_strategy()).prop_map(|(n, class, preference)| {
                PackagePolicyInput {
                    package_id: format!("pkg-{n}"),
                    class,
                    preference,
                }
            }),
            1..8,
        )
    }

    proptest! {
        #[test]
        fn property_resolution_is_deterministic(packages in packages_strategy()) {
            let first = resolve_automation(&packages).unwrap();
            let second = resolve_automation(&packages).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn property_guaranteed_is_never_automated(packages in packages_strategy()) {
            let resolution = resolve_automation(&packages).unwrap();
            if packages.iter().any(|p| p.class == LineItemClass::Guaranteed) {
                prop_assert_eq!(resolution.mode, AutomationMode::Manual);
            }
        }

        #[test]
        fn property_mode_is_manual_or_first_preference(packages in packages_strategy()) {
            let resolution = resolve_automation(&packages).unwrap();
            let first = packages[0].preference;
            prop_assert!(
                resolution.mode == AutomationMode::Manual || resolution.mode == first
            );
        }
    }
}
