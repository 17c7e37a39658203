//! Buyer-facing webhook notifications for decision outcomes.

use crate::{build_http_client, NotifyError, NotifyResult};
use async_trait::async_trait;
use buyline_types::{MediaBuyStatus, PushConfig};
use serde::Serialize;
use tracing::debug;

/// Per-package outcome line in the webhook payload.
#[derive(Debug, Clone, Serialize)]
pub struct PackageOutcome {
    pub package_id: String,
    pub status: String,
}

/// Result body describing where the buy landed after a decision.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResultPayload {
    pub media_buy_id: String,
    pub buyer_ref: String,
    pub status: MediaBuyStatus,
    pub packages: Vec<PackageOutcome>,
}

/// Envelope for one webhook send.
#[derive(Debug, Clone, Serialize)]
pub struct TaskNotification {
    pub task_id: String,
    pub task_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResultPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Capability for pushing decision outcomes back to the buyer.
#[async_trait]
pub trait BuyerNotifier: Send + Sync {
    async fn send_notification(
        &self,
        push: &PushConfig,
        notification: &TaskNotification,
    ) -> NotifyResult<()>;
}

/// HTTP implementation posting to the buyer's configured push URL.
pub struct BuyerWebhookNotifier {
    client: reqwest::Client,
}

impl BuyerWebhookNotifier {
    pub fn new() -> NotifyResult<Self> {
        Ok(Self {
            client: build_http_client(4)?,
        })
    }
}

#[async_trait]
impl BuyerNotifier for BuyerWebhookNotifier {
    async fn send_notification(
        &self,
        push: &PushConfig,
        notification: &TaskNotification,
    ) -> NotifyResult<()> {
        let mut request = self.client.post(&push.url).json(notification);
        if let Some(token) = &push.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        debug!(
            task_id = %notification.task_id,
            url = %push.url,
            "Delivered buyer webhook"
        );
        Ok(())
    }
}
