use thiserror::Error;

/// Result type for adapter operations.
pub type AdServerResult<T> = Result<T, AdServerError>;

/// Errors raised by ad server adapters.
#[derive(Debug, Error)]
pub enum AdServerError {
    #[error("order creation rejected: {0}")]
    OrderRejected(String),

    #[error("order activation failed: {0}")]
    ActivationFailed(String),

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("unknown line item type `{0}`")]
    UnknownLineItemType(String),

    #[error("ad server unavailable: {0}")]
    Unavailable(String),
}

impl AdServerError {
    /// Whether the error is a configuration problem the caller must
    /// fix, as opposed to an execution failure on the ad server side.
    pub fn is_validation(&self) -> bool {
        matches!(self, AdServerError::UnknownLineItemType(_))
    }
}
