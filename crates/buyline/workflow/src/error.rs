use buyline_adserver::AdServerError;
use buyline_policy::PolicyError;
use buyline_storage::StorageError;
use thiserror::Error;

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Failures the caller cannot resolve by handling a decision outcome.
///
/// Expected outcomes of a decision (conflict, not found, already
/// decided) are carried by `DecisionOutcome`, not raised here.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("ad server error: {0}")]
    AdServer(#[from] AdServerError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl WorkflowError {
    /// Whether the failure is the caller's input rather than a system
    /// fault. Drives the 4xx/5xx split at the API boundary.
    pub fn is_validation(&self) -> bool {
        match self {
            WorkflowError::InvalidRequest(_) | WorkflowError::Policy(_) => true,
            WorkflowError::AdServer(err) => err.is_validation(),
            WorkflowError::Storage(err) => matches!(err, StorageError::InvalidInput(_)),
        }
    }
}
