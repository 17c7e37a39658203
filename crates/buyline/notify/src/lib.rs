//! Outbound notification side channels.
//!
//! Two advisory channels hang off the workflow engine: an operator
//! chat message when a step is created, and a buyer webhook when a
//! decision lands. Both are best-effort; the durable record is always
//! the store, never the notification. Callers log failures at warn and
//! move on.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod chat;
mod error;
mod webhook;

pub use chat::{ChatNotifier, NoticeColor, OperatorNotifier, StepNotice};
pub use error::{NotifyError, NotifyResult};
pub use webhook::{
    BuyerNotifier, BuyerWebhookNotifier, PackageOutcome, TaskNotification, TaskResultPayload,
};

/// Shared outbound client with a bounded timeout. Notifications are
/// side channels; they must never hold a request open for long.
pub(crate) fn build_http_client(timeout_secs: u64) -> NotifyResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NotifyError::ClientBuild(e.to_string()))
}
