//! Core domain types for the buyline workflow engine.
//!
//! This crate defines the records shared by every other buyline crate:
//! - media buys and their flight windows
//! - creatives and package assignments
//! - workflow steps, decisions, and object mappings
//! - intake request payloads and automation policy inputs
//!
//! Types here are plain data. Behavior lives in the policy, readiness,
//! and workflow crates.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod creative;
mod ids;
mod media_buy;
mod policy;
mod request;
mod workflow;

pub use creative::{Creative, CreativeAssignment, CreativeStatus};
pub use ids::{CreativeId, MediaBuyId, PrincipalId, TenantId, WorkflowStepId};
pub use media_buy::{FlightWindow, MediaBuy, MediaBuyStatus};
pub use policy::{AutomationMode, LineItemClass, ProductConfig};
pub use request::{MediaBuyRequest, PackageRequest, PackageSummary, PushConfig};
pub use workflow::{
    DecisionAction, ObjectType, ObjectWorkflowMapping, StepComment, StepRequestPayload, StepType,
    WorkflowAction, WorkflowStep, WorkflowStepStatus,
};
