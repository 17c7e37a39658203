//! Buyline storage abstractions.
//!
//! This crate defines the persistence contract for the workflow engine:
//! - media buy records and their guarded status transitions
//! - creatives and package assignments
//! - workflow steps with optimistic-concurrency decisions
//! - object-to-step mappings for reverse lookup
//!
//! Design stance:
//! - Postgres is the transactional source of truth.
//! - The in-memory adapter exists for tests and single-process runs and
//!   implements the same conflict semantics.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryBuylineStorage;
pub use traits::{
    BuylineStorage, CreativeStore, MediaBuyFilter, MediaBuyStore, QueryWindow, StepFilter,
    WorkflowStore,
};
