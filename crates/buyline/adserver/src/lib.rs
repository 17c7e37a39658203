//! Ad server adapter capability.
//!
//! The workflow engine never builds ad-server request bodies itself;
//! order creation, activation, and line-item classification go through
//! the `AdServerAdapter` trait. The simulated backend implements the
//! same contract deterministically for development and tests.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod adapter;
mod error;
pub mod simulated;

pub use adapter::{AdServerAdapter, OrderRequest};
pub use error::{AdServerError, AdServerResult};
pub use simulated::SimulatedAdServer;
