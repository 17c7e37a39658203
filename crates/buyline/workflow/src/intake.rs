//! Media buy intake orchestration.
//!
//! Intake validates the request, resolves the automation mode from the
//! packages, persists the buy, and then runs exactly one of three
//! paths: fully automatic execution, order creation gated on approval,
//! or a manual task with no adapter involvement at all.

use crate::retry::{adapter_call, DEFAULT_ADAPTER_TIMEOUT};
use crate::steps::WorkflowStepManager;
use crate::{WorkflowError, WorkflowResult};
use buyline_adserver::{AdServerAdapter, OrderRequest};
use buyline_policy::{resolve_automation, AutomationResolution, PackagePolicyInput};
use buyline_storage::BuylineStorage;
use buyline_types::{
    AutomationMode, MediaBuy, MediaBuyRequest, MediaBuyStatus, PrincipalId, TenantId, WorkflowStep,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Outcome of one accepted intake request.
#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    /// The buy as persisted, including any status moves made here.
    pub buy: MediaBuy,
    pub resolution: AutomationResolution,
    /// Step created when a human gate applies.
    pub step: Option<WorkflowStep>,
    /// Ad server failure recorded against the buy. Set only when the
    /// buy ended up `failed`.
    pub adapter_error: Option<String>,
}

/// Routes creation requests through the automation policy.
pub struct MediaBuyIntake {
    storage: Arc<dyn BuylineStorage>,
    adserver: Arc<dyn AdServerAdapter>,
    steps: WorkflowStepManager,
    adapter_timeout: Duration,
}

impl MediaBuyIntake {
    pub fn new(
        storage: Arc<dyn BuylineStorage>,
        adserver: Arc<dyn AdServerAdapter>,
        steps: WorkflowStepManager,
    ) -> Self {
        Self {
            storage,
            adserver,
            steps,
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }

    /// Override the per-call ad server bound.
    pub fn with_adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    /// Accept a media buy and execute its automation path. The record
    /// is durable before any external call; adapter failures land the
    /// buy in `failed` rather than erasing it.
    pub async fn create_media_buy(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        request: MediaBuyRequest,
        now: DateTime<Utc>,
    ) -> WorkflowResult<IntakeOutcome> {
        validate_request(&request)?;

        let mut inputs = Vec::with_capacity(request.packages.len());
        for package in &request.packages {
            let class = self.adserver.classify_line_item(&package.product).await?;
            inputs.push(PackagePolicyInput {
                package_id: package.package_id.clone(),
                class,
                preference: package.product.automation,
            });
        }
        let resolution = resolve_automation(&inputs)?;

        let mut buy = MediaBuy::from_request(tenant_id, principal_id, request, now);
        self.storage.create_media_buy(buy.clone()).await?;
        info!(
            media_buy_id = %buy.id,
            buyer_ref = %buy.buyer_ref,
            mode = %resolution.mode,
            "Accepted media buy"
        );

        let (step, adapter_error) = match resolution.mode {
            AutomationMode::Automatic => (None, self.run_automatic(&mut buy, now).await?),
            AutomationMode::ConfirmationRequired => {
                self.run_confirmation(&mut buy, resolution.mode, now).await?
            }
            AutomationMode::Manual => {
                let step = self.run_manual(&mut buy, resolution.mode, now).await?;
                (Some(step), None)
            }
        };

        Ok(IntakeOutcome {
            buy,
            resolution,
            step,
            adapter_error,
        })
    }

    /// Create and activate without a human. Failure at either adapter
    /// call forces the buy into `failed`.
    async fn run_automatic(
        &self,
        buy: &mut MediaBuy,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Option<String>> {
        let order_id = match self.create_order(buy).await {
            Ok(order_id) => order_id,
            Err(message) => {
                self.fail_buy(buy, &message, now).await?;
                return Ok(Some(message));
            }
        };
        self.storage
            .set_external_order_id(&buy.id, &order_id, now)
            .await?;
        buy.external_order_id = Some(order_id.clone());

        let target = buy.flight_status(now);
        if target == MediaBuyStatus::Active {
            if let Err(message) =
                adapter_call(self.adapter_timeout, self.adserver.activate_order(&order_id)).await
            {
                self.fail_buy(buy, &message, now).await?;
                return Ok(Some(message));
            }
        }

        self.storage
            .set_media_buy_status(&buy.id, target, now)
            .await?;
        buy.status = target;
        buy.updated_at = now;
        info!(media_buy_id = %buy.id, status = %target, "Automatic path completed");
        Ok(None)
    }

    /// Create the order, then gate activation on a human decision.
    async fn run_confirmation(
        &self,
        buy: &mut MediaBuy,
        mode: AutomationMode,
        now: DateTime<Utc>,
    ) -> WorkflowResult<(Option<WorkflowStep>, Option<String>)> {
        let order_id = match self.create_order(buy).await {
            Ok(order_id) => order_id,
            Err(message) => {
                self.fail_buy(buy, &message, now).await?;
                return Ok((None, Some(message)));
            }
        };
        self.storage
            .set_external_order_id(&buy.id, &order_id, now)
            .await?;
        buy.external_order_id = Some(order_id.clone());

        self.into_approval_queue(buy, now).await?;

        let step = self
            .steps
            .create_activation_approval(
                buy,
                &order_id,
                self.adserver.order_url(&order_id),
                mode,
                now,
            )
            .await?;
        Ok((Some(step), None))
    }

    /// Never touch the ad server; a human creates the order out of band
    /// from the replayed request.
    async fn run_manual(
        &self,
        buy: &mut MediaBuy,
        mode: AutomationMode,
        now: DateTime<Utc>,
    ) -> WorkflowResult<WorkflowStep> {
        self.into_approval_queue(buy, now).await?;
        self.steps.create_manual_creation(buy, mode, now).await
    }

    async fn into_approval_queue(
        &self,
        buy: &mut MediaBuy,
        now: DateTime<Utc>,
    ) -> WorkflowResult<()> {
        self.storage
            .transition_media_buy(
                &buy.id,
                MediaBuyStatus::Draft,
                MediaBuyStatus::PendingApproval,
                now,
            )
            .await?;
        buy.status = MediaBuyStatus::PendingApproval;
        buy.updated_at = now;
        Ok(())
    }

    async fn fail_buy(
        &self,
        buy: &mut MediaBuy,
        message: &str,
        now: DateTime<Utc>,
    ) -> WorkflowResult<()> {
        error!(
            media_buy_id = %buy.id,
            error = %message,
            "Ad server execution failed during intake"
        );
        self.storage
            .set_media_buy_status(&buy.id, MediaBuyStatus::Failed, now)
            .await?;
        buy.status = MediaBuyStatus::Failed;
        buy.updated_at = now;
        Ok(())
    }

    async fn create_order(&self, buy: &MediaBuy) -> Result<String, String> {
        let order = OrderRequest {
            media_buy_id: &buy.id,
            buyer: &buy.principal_id,
            budget: buy.budget,
            flight: &buy.flight,
            packages: &buy.request.packages,
        };
        adapter_call(self.adapter_timeout, self.adserver.create_order(order)).await
    }
}

fn validate_request(request: &MediaBuyRequest) -> WorkflowResult<()> {
    if request.buyer_ref.trim().is_empty() {
        return Err(WorkflowError::InvalidRequest(
            "buyer_ref must not be empty".to_string(),
        ));
    }
    if !request.flight.is_well_formed() {
        return Err(WorkflowError::InvalidRequest(
            "flight window ends before it starts".to_string(),
        ));
    }
    if request.budget <= 0.0 {
        return Err(WorkflowError::InvalidRequest(
            "budget must be positive".to_string(),
        ));
    }
    Ok(())
}
