//! Workflow step creation and operator announcement.
//!
//! Steps are the durable record of a pending human decision; the chat
//! notice is an enhancement. Creation fails only when the store does.

use crate::WorkflowResult;
use buyline_notify::{NoticeColor, OperatorNotifier, StepNotice};
use buyline_storage::BuylineStorage;
use buyline_types::{
    AutomationMode, MediaBuy, ObjectWorkflowMapping, StepRequestPayload, StepType, WorkflowAction,
    WorkflowStep,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Role expected to action publisher-side steps.
const PUBLISHER_OWNER: &str = "publisher";

/// Creates approval-gated work items and announces them to operators.
pub struct WorkflowStepManager {
    storage: Arc<dyn BuylineStorage>,
    operator: Arc<dyn OperatorNotifier>,
}

impl WorkflowStepManager {
    pub fn new(storage: Arc<dyn BuylineStorage>, operator: Arc<dyn OperatorNotifier>) -> Self {
        Self { storage, operator }
    }

    /// Persist an approval step gating activation of an order that
    /// already exists on the ad server.
    pub async fn create_activation_approval(
        &self,
        buy: &MediaBuy,
        external_order_id: &str,
        order_url: Option<String>,
        automation: AutomationMode,
        now: DateTime<Utc>,
    ) -> WorkflowResult<WorkflowStep> {
        let instructions = format!(
            "Review order {} for buyer ref {} and approve activation",
            external_order_id, buy.buyer_ref
        );
        let payload = StepRequestPayload::ActivationApproval {
            media_buy_id: buy.id.clone(),
            external_order_id: external_order_id.to_string(),
            order_url,
            packages: buy.request.package_summaries(),
        };
        let step = WorkflowStep::awaiting_approval(
            buy.tenant_id.clone(),
            buy.principal_id.clone(),
            StepType::Approval,
            PUBLISHER_OWNER,
            instructions,
            payload,
            now,
        );
        let mapping = ObjectWorkflowMapping::for_media_buy(
            &buy.id,
            step.id.clone(),
            WorkflowAction::Activate,
            now,
        );

        self.storage.create_step(step.clone(), mapping).await?;
        info!(step_id = %step.id, media_buy_id = %buy.id, "Created activation approval step");

        self.announce(
            &step,
            automation,
            NoticeColor::Warning,
            "Media buy awaiting activation approval",
        )
        .await;
        Ok(step)
    }

    /// Persist a manual task for an order no adapter will create. The
    /// payload replays the full request so a human can rebuild it.
    pub async fn create_manual_creation(
        &self,
        buy: &MediaBuy,
        automation: AutomationMode,
        now: DateTime<Utc>,
    ) -> WorkflowResult<WorkflowStep> {
        let instructions = format!(
            "Create the ad server order for buyer ref {} by hand ({} packages, budget {:.2}), then approve this step",
            buy.buyer_ref,
            buy.request.packages.len(),
            buy.budget
        );
        let payload = StepRequestPayload::ManualCreation {
            media_buy_id: buy.id.clone(),
            request: buy.request.clone(),
        };
        let step = WorkflowStep::awaiting_approval(
            buy.tenant_id.clone(),
            buy.principal_id.clone(),
            StepType::ManualTask,
            PUBLISHER_OWNER,
            instructions,
            payload,
            now,
        );
        let mapping = ObjectWorkflowMapping::for_media_buy(
            &buy.id,
            step.id.clone(),
            WorkflowAction::Create,
            now,
        );

        self.storage.create_step(step.clone(), mapping).await?;
        info!(step_id = %step.id, media_buy_id = %buy.id, "Created manual creation step");

        self.announce(
            &step,
            automation,
            NoticeColor::Danger,
            "Media buy requires manual order creation",
        )
        .await;
        Ok(step)
    }

    /// Best-effort operator announcement. The step is already durable;
    /// a failed notification is logged and dropped.
    async fn announce(
        &self,
        step: &WorkflowStep,
        automation: AutomationMode,
        color: NoticeColor,
        title: &str,
    ) {
        let notice = StepNotice {
            title: title.to_string(),
            color,
            step_id: step.id.to_string(),
            automation_mode: automation,
            first_instruction: step
                .instructions
                .lines()
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        if let Err(err) = self.operator.notify(&notice).await {
            warn!(error = %err, step_id = %step.id, "Operator notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        future_flight, package, request_with, test_now, CountingOperatorNotifier,
    };
    use buyline_storage::{InMemoryBuylineStorage, WorkflowStore};
    use buyline_types::{MediaBuyRequest, ObjectType, PrincipalId, TenantId, WorkflowStepStatus};
    use std::sync::atomic::Ordering;

    fn sample_buy(request: MediaBuyRequest) -> MediaBuy {
        MediaBuy::from_request(
            TenantId::new("default"),
            PrincipalId::new("buyer-1"),
            request,
            test_now(),
        )
    }

    #[tokio::test]
    async fn test_activation_step_is_durable_and_announced() {
        let storage = std::sync::Arc::new(InMemoryBuylineStorage::new());
        let operator = std::sync::Arc::new(CountingOperatorNotifier::default());
        let manager = WorkflowStepManager::new(storage.clone(), operator.clone());
        let buy = sample_buy(request_with(
            vec![package("pkg-1", "price_priority", AutomationMode::ConfirmationRequired)],
            future_flight(),
            None,
        ));

        let step = manager
            .create_activation_approval(&buy, "sim-order-9", None, AutomationMode::ConfirmationRequired, test_now())
            .await
            .unwrap();

        assert_eq!(step.status, WorkflowStepStatus::RequiresApproval);
        assert_eq!(step.version, 1);
        match &step.request {
            StepRequestPayload::ActivationApproval {
                external_order_id,
                packages,
                ..
            } => {
                assert_eq!(external_order_id, "sim-order-9");
                assert_eq!(packages.len(), 1);
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let linked = storage
            .steps_for_object(ObjectType::MediaBuy, &buy.id.to_string())
            .await
            .unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, step.id);
        assert_eq!(operator.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_step_creation() {
        let storage = std::sync::Arc::new(InMemoryBuylineStorage::new());
        let operator = std::sync::Arc::new(CountingOperatorNotifier::default());
        operator.fail.store(true, Ordering::SeqCst);
        let manager = WorkflowStepManager::new(storage.clone(), operator.clone());
        let buy = sample_buy(request_with(
            vec![package("pkg-1", "price_priority", AutomationMode::ConfirmationRequired)],
            future_flight(),
            None,
        ));

        let step = manager
            .create_manual_creation(&buy, AutomationMode::Manual, test_now())
            .await
            .unwrap();

        assert!(storage.get_step(&step.id).await.unwrap().is_some());
        assert_eq!(operator.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_manual_step_replays_the_request() {
        let storage = std::sync::Arc::new(InMemoryBuylineStorage::new());
        let operator = std::sync::Arc::new(CountingOperatorNotifier::default());
        let manager = WorkflowStepManager::new(storage, operator);
        let request = request_with(
            vec![
                package("pkg-1", "standard", AutomationMode::Manual),
                package("pkg-2", "standard", AutomationMode::Manual),
            ],
            future_flight(),
            None,
        );
        let buy = sample_buy(request.clone());

        let step = manager
            .create_manual_creation(&buy, AutomationMode::Manual, test_now())
            .await
            .unwrap();

        assert_eq!(step.step_type, StepType::ManualTask);
        match &step.request {
            StepRequestPayload::ManualCreation { request: replay, .. } => {
                assert_eq!(replay, &request);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
