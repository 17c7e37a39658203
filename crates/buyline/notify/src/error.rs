use thiserror::Error;

/// Result type for notification sends.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors raised by notification channels. All of them are advisory:
/// callers log and continue.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http client build failed: {0}")]
    ClientBuild(String),

    #[error("notification send failed: {0}")]
    Send(String),

    #[error("notification rejected with status {0}")]
    Rejected(u16),
}
