//! Approval execution under optimistic concurrency.
//!
//! A decision lands in two phases. Phase one is the compare-and-swap on
//! the step record, retried a bounded number of times when another
//! writer gets in between the read and the write. Phase two runs the
//! side effects the landed decision unlocked: the media buy status
//! write, the gated ad server calls, and the buyer webhook. Phase two
//! never rolls phase one back; a downstream failure is recorded against
//! the media buy and surfaced in the receipt instead.

use crate::retry::{adapter_call, with_retries, DECIDE_ATTEMPTS, DEFAULT_ADAPTER_TIMEOUT};
use crate::WorkflowResult;
use buyline_adserver::{AdServerAdapter, OrderRequest};
use buyline_notify::{BuyerNotifier, PackageOutcome, TaskNotification, TaskResultPayload};
use buyline_readiness::creatives_ready;
use buyline_storage::{BuylineStorage, StorageError};
use buyline_types::{
    DecisionAction, MediaBuy, MediaBuyStatus, StepComment, StepRequestPayload, WorkflowStep,
    WorkflowStepId, WorkflowStepStatus,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// One human decision against one workflow step.
#[derive(Debug, Clone, Copy)]
pub struct DecisionRequest<'a> {
    pub step_id: &'a WorkflowStepId,
    /// Step version the deciding human last observed.
    pub expected_version: u64,
    pub action: DecisionAction,
    /// Recorded as the author of the decision comment.
    pub actor: &'a str,
    pub reason: Option<&'a str>,
}

/// What a landed decision did to the world.
#[derive(Debug, Clone)]
pub struct DecisionReceipt {
    /// The step after the decision, version bumped and comment appended.
    pub step: WorkflowStep,
    /// Media buy status after side effects, when the governed buy could
    /// be loaded.
    pub media_buy_status: Option<MediaBuyStatus>,
    /// Downstream ad server failure surfaced to the approver. The
    /// approval itself stands.
    pub adapter_error: Option<String>,
}

/// Expected outcomes of a decision, carried as values so the API layer
/// can map each to its own response without string matching.
#[derive(Debug)]
pub enum DecisionOutcome {
    /// The decision landed and its side effects ran.
    Ok(DecisionReceipt),
    /// Retries exhausted; the step kept changing under the caller.
    Conflict,
    /// No step with that id.
    NotFound,
    /// The step already carries a decision.
    AlreadyDecided { status: WorkflowStepStatus },
    /// The request could not be evaluated at all.
    Invalid { reason: String },
}

/// Result of one compare-and-swap cycle.
enum CasOutcome {
    Applied(WorkflowStep),
    NotFound,
    AlreadyDecided(WorkflowStepStatus),
}

/// Applies human decisions to workflow steps and runs the side effects
/// an approval or rejection unlocks.
pub struct ApprovalExecutor {
    storage: Arc<dyn BuylineStorage>,
    adserver: Arc<dyn AdServerAdapter>,
    buyer: Arc<dyn BuyerNotifier>,
    adapter_timeout: Duration,
}

impl ApprovalExecutor {
    pub fn new(
        storage: Arc<dyn BuylineStorage>,
        adserver: Arc<dyn AdServerAdapter>,
        buyer: Arc<dyn BuyerNotifier>,
    ) -> Self {
        Self {
            storage,
            adserver,
            buyer,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }

    /// Override the per-call ad server bound.
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    /// Apply one decision. Expected contention outcomes come back as
    /// `DecisionOutcome` variants; only system faults raise an error.
    pub async fn decide(
        &self,
        request: DecisionRequest<'_>,
        now: DateTime<Utc>,
    ) -> WorkflowResult<DecisionOutcome> {
        if request.expected_version == 0 {
            return Ok(DecisionOutcome::Invalid {
                reason: "expected_version must be at least 1".to_string(),
            });
        }
        if request.actor.trim().is_empty() {
            return Ok(DecisionOutcome::Invalid {
                reason: "actor must not be empty".to_string(),
            });
        }

        let cas = with_retries(
            DECIDE_ATTEMPTS,
            |attempt| self.decide_once(request, attempt, now),
            |err: &StorageError| err.is_retryable(),
        )
        .await;

        let step = match cas {
            Ok(CasOutcome::Applied(step)) => step,
            Ok(CasOutcome::NotFound) => return Ok(DecisionOutcome::NotFound),
            Ok(CasOutcome::AlreadyDecided(status)) => {
                return Ok(DecisionOutcome::AlreadyDecided { status })
            }
            Err(err) if err.is_retryable() => {
                warn!(step_id = %request.step_id, "Decision retries exhausted");
                return Ok(DecisionOutcome::Conflict);
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            step_id = %step.id,
            action = %request.action,
            actor = request.actor,
            version = step.version,
            "Decision applied"
        );

        let receipt = match request.action {
            DecisionAction::Approve => self.execute_approval(step, now).await?,
            DecisionAction::Reject => self.execute_rejection(step, now).await?,
        };
        Ok(DecisionOutcome::Ok(receipt))
    }

    /// One read-validate-write cycle. The first attempt guards on the
    /// version the human observed; retries guard on a fresh read, which
    /// is safe because any decision that landed in between moves the
    /// step out of the awaiting state and is caught by the status check.
    async fn decide_once(
        &self,
        request: DecisionRequest<'_>,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> Result<CasOutcome, StorageError> {
        let Some(step) = self.storage.get_step(request.step_id).await? else {
            return Ok(CasOutcome::NotFound);
        };
        if !step.status.awaits_decision() {
            return Ok(CasOutcome::AlreadyDecided(step.status));
        }

        let guard_version = if attempt == 1 {
            request.expected_version
        } else {
            step.version
        };

        let new_status = match request.action {
            DecisionAction::Approve => WorkflowStepStatus::Approved,
            DecisionAction::Reject => WorkflowStepStatus::Rejected,
        };
        let body = match request.reason {
            Some(reason) => format!("{}: {}", request.action, reason),
            None => request.action.to_string(),
        };
        let comment = StepComment {
            author: request.actor.to_string(),
            body,
            created_at: now,
        };

        match self
            .storage
            .decide_step(request.step_id, guard_version, new_status, comment, now)
            .await
        {
            Ok(updated) => Ok(CasOutcome::Applied(updated)),
            Err(StorageError::NotFound(_)) => Ok(CasOutcome::NotFound),
            Err(StorageError::InvariantViolation(_)) => {
                // Lost the race after our read; report the final state.
                match self.storage.get_step(request.step_id).await? {
                    Some(current) => Ok(CasOutcome::AlreadyDecided(current.status)),
                    None => Ok(CasOutcome::NotFound),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Post-approval side effects. The approval is durable before this
    /// runs and is never rolled back here: an ad server failure forces
    /// the media buy into `failed` while the step stays approved.
    async fn execute_approval(
        &self,
        step: WorkflowStep,
        now: DateTime<Utc>,
    ) -> WorkflowResult<DecisionReceipt> {
        let media_buy_id = step.request.media_buy_id().clone();
        let Some(buy) = self.storage.get_media_buy(&media_buy_id).await? else {
            error!(
                step_id = %step.id,
                media_buy_id = %media_buy_id,
                "Approved step references a missing media buy"
            );
            let detail = format!("media buy {media_buy_id} not found");
            return Ok(DecisionReceipt {
                step,
                media_buy_status: None,
                adapter_error: Some(detail),
            });
        };

        let assignments = self.storage.list_assignments(&buy.id).await?;
        let creatives = self.storage.list_creatives_for_buy(&buy.id).await?;

        let (status, adapter_error) =
            if creatives_ready(&buy.request.packages, &assignments, &creatives) {
                // Status first, then external calls: a crash in between
                // leaves a truthful record and the calls are idempotent.
                let target = buy.flight_status(now);
                self.storage
                    .set_media_buy_status(&buy.id, target, now)
                    .await?;
                match self
                    .run_adapter_effects(&buy, &step.request, target, now)
                    .await
                {
                    Ok(()) => {
                        info!(media_buy_id = %buy.id, status = %target, "Approval executed");
                        (target, None)
                    }
                    Err(message) => {
                        error!(
                            media_buy_id = %buy.id,
                            error = %message,
                            "Ad server execution failed after approval"
                        );
                        self.storage
                            .set_media_buy_status(&buy.id, MediaBuyStatus::Failed, now)
                            .await?;
                        (MediaBuyStatus::Failed, Some(message))
                    }
                }
            } else {
                // Hold the buy back; the readiness view explains the gap.
                info!(media_buy_id = %buy.id, "Approved without ready creatives, holding as draft");
                self.storage
                    .set_media_buy_status(&buy.id, MediaBuyStatus::Draft, now)
                    .await?;
                (MediaBuyStatus::Draft, None)
            };

        self.push_outcome(&buy, &step, status, adapter_error.clone())
            .await;

        Ok(DecisionReceipt {
            step,
            media_buy_status: Some(status),
            adapter_error,
        })
    }

    /// Gated ad server effects for an approved step. Activation
    /// approvals reference an order that already exists: creation is
    /// re-driven idempotently to heal a lost order id, and activation
    /// fires only when the buy enters `active`. Manual-creation steps
    /// never touch the adapter; the order lives outside the system.
    async fn run_adapter_effects(
        &self,
        buy: &MediaBuy,
        payload: &StepRequestPayload,
        target: MediaBuyStatus,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let StepRequestPayload::ActivationApproval { .. } = payload else {
            return Ok(());
        };

        let order = OrderRequest {
            media_buy_id: &buy.id,
            buyer: &buy.principal_id,
            budget: buy.budget,
            flight: &buy.flight,
            packages: &buy.request.packages,
        };
        let order_id = adapter_call(self.adapter_timeout, self.adserver.create_order(order)).await?;
        if let Err(err) = self
            .storage
            .set_external_order_id(&buy.id, &order_id, now)
            .await
        {
            warn!(media_buy_id = %buy.id, error = %err, "Could not record external order id");
        }

        if target == MediaBuyStatus::Active {
            adapter_call(self.adapter_timeout, self.adserver.activate_order(&order_id)).await?;
        }
        Ok(())
    }

    /// Post-rejection side effects: move the buy out of the approval
    /// queue. Only a pending buy moves; anything else keeps its status
    /// and the mismatch is logged.
    async fn execute_rejection(
        &self,
        step: WorkflowStep,
        now: DateTime<Utc>,
    ) -> WorkflowResult<DecisionReceipt> {
        let media_buy_id = step.request.media_buy_id().clone();
        let Some(buy) = self.storage.get_media_buy(&media_buy_id).await? else {
            warn!(
                step_id = %step.id,
                media_buy_id = %media_buy_id,
                "Rejected step references a missing media buy"
            );
            return Ok(DecisionReceipt {
                step,
                media_buy_status: None,
                adapter_error: None,
            });
        };

        let status = match self
            .storage
            .transition_media_buy(
                &buy.id,
                MediaBuyStatus::PendingApproval,
                MediaBuyStatus::Rejected,
                now,
            )
            .await
        {
            Ok(()) => {
                info!(media_buy_id = %buy.id, "Media buy rejected");
                MediaBuyStatus::Rejected
            }
            Err(StorageError::InvariantViolation(detail)) => {
                warn!(
                    media_buy_id = %buy.id,
                    detail = %detail,
                    "Rejection left media buy status untouched"
                );
                buy.status
            }
            Err(err) => return Err(err.into()),
        };

        self.push_outcome(&buy, &step, status, None).await;

        Ok(DecisionReceipt {
            step,
            media_buy_status: Some(status),
            adapter_error: None,
        })
    }

    /// Best-effort webhook back to the buyer. Failures are logged and
    /// dropped; the store already holds the truth.
    async fn push_outcome(
        &self,
        buy: &MediaBuy,
        step: &WorkflowStep,
        status: MediaBuyStatus,
        adapter_error: Option<String>,
    ) {
        let Some(push) = &buy.request.push else {
            return;
        };

        let notification = TaskNotification {
            task_id: step.id.to_string(),
            task_type: step.step_type.as_str().to_string(),
            status: step.status.as_str().to_string(),
            result: Some(TaskResultPayload {
                media_buy_id: buy.id.to_string(),
                buyer_ref: buy.buyer_ref.clone(),
                status,
                packages: buy
                    .request
                    .packages
                    .iter()
                    .map(|package| PackageOutcome {
                        package_id: package.package_id.clone(),
                        status: status.as_str().to_string(),
                    })
                    .collect(),
            }),
            error: adapter_error,
        };

        if let Err(err) = self.buyer.send_notification(push, &notification).await {
            warn!(media_buy_id = %buy.id, error = %err, "Buyer webhook failed");
        }
    }
}
