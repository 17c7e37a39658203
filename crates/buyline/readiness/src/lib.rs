//! Derived operational state for media buys.
//!
//! The readiness engine answers "what state is this buy really in and
//! what is stopping it" from already-fetched facts. It never touches
//! storage, never mutates anything, and never errors; a `failed`
//! readiness state is a diagnostic value, not an exception.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod engine;
mod state;

pub use engine::{compute, compute_missing, creatives_ready};
pub use state::{ReadinessDetails, ReadinessState};
