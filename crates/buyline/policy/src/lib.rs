//! Automation policy resolution for media buy intake.
//!
//! One question is answered here: given the packages of an incoming
//! media buy, how much of the order lifecycle may run without a human?
//! The answer is deterministic and side-effect free so intake can call
//! it exactly once and persist the outcome.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
mod resolver;

pub use error::{PolicyError, Result};
pub use resolver::{
    resolve_automation, AutomationResolution, PackagePolicyInput, ResolutionReason,
};
