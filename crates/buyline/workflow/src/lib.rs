//! Orchestration layer for the buyline engine.
//!
//! Three services live here, each built over the storage traits and
//! the adapter/notifier capabilities:
//! - `MediaBuyIntake` routes a creation request through the automation
//!   policy and executes the selected path.
//! - `WorkflowStepManager` persists approval-gated work items and
//!   announces them to operators.
//! - `ApprovalExecutor` applies human decisions under optimistic
//!   concurrency and triggers the gated ad server side effects.
//!
//! Expected decision outcomes (conflict, not found, already decided)
//! are values, not errors; `WorkflowError` is reserved for failures the
//! caller cannot act on.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
mod executor;
mod intake;
mod retry;
mod steps;
#[cfg(test)]
mod testutil;

pub use error::{WorkflowError, WorkflowResult};
pub use executor::{ApprovalExecutor, DecisionOutcome, DecisionReceipt, DecisionRequest};
pub use intake::{IntakeOutcome, MediaBuyIntake};
pub use retry::{with_retries, DECIDE_ATTEMPTS};
pub use steps::WorkflowStepManager;
