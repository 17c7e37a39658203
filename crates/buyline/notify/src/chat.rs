//! Operator chat notifications for newly created workflow steps.

use crate::{build_http_client, NotifyError, NotifyResult};
use async_trait::async_trait;
use buyline_types::AutomationMode;
use serde::Serialize;
use tracing::debug;

/// Attachment color hint for the chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeColor {
    Good,
    Warning,
    Danger,
}

impl NoticeColor {
    fn as_hex(&self) -> &'static str {
        match self {
            NoticeColor::Good => "#2eb886",
            NoticeColor::Warning => "#daa038",
            NoticeColor::Danger => "#a30200",
        }
    }
}

/// Payload describing a step that needs operator attention.
#[derive(Debug, Clone, Serialize)]
pub struct StepNotice {
    pub title: String,
    pub color: NoticeColor,
    pub step_id: String,
    pub automation_mode: AutomationMode,
    /// First human-readable instruction line from the step.
    pub first_instruction: String,
}

/// Capability for announcing new steps to operators.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify(&self, notice: &StepNotice) -> NotifyResult<()>;
}

/// Chat-webhook-backed operator notifier. The payload follows the
/// Slack incoming-webhook attachment shape, which most chat tools
/// accept.
pub struct ChatNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl ChatNotifier {
    /// Build a notifier. With no webhook URL configured, every notify
    /// is a logged no-op.
    pub fn new(webhook_url: Option<String>) -> NotifyResult<Self> {
        Ok(Self {
            client: build_http_client(4)?,
            webhook_url,
        })
    }
}

#[async_trait]
impl OperatorNotifier for ChatNotifier {
    async fn notify(&self, notice: &StepNotice) -> NotifyResult<()> {
        let Some(url) = &self.webhook_url else {
            debug!(step_id = %notice.step_id, "Chat notifications disabled; dropping notice");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&chat_body(notice))
            .send()
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        debug!(step_id = %notice.step_id, "Posted step notice to chat");
        Ok(())
    }
}

fn chat_body(notice: &StepNotice) -> serde_json::Value {
    serde_json::json!({
        "attachments": [{
            "title": notice.title,
            "color": notice.color.as_hex(),
            "fields": [
                { "title": "Step", "value": notice.step_id, "short": true },
                { "title": "Automation", "value": notice.automation_mode.as_str(), "short": true },
                { "title": "Next action", "value": notice.first_instruction, "short": false },
            ],
        }]
    })
}
