//! Error types for automation policy resolution

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Automation policy resolution errors
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyError {
    /// A media buy with no packages has nothing to resolve against
    #[error("Cannot resolve automation for a media buy with no packages")]
    NoPackages,
}

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;
