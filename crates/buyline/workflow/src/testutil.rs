//! Shared fixtures for workflow tests: a fixed clock, request
//! builders, counting notifier fakes, and a conflict-injecting storage
//! wrapper.

use crate::executor::ApprovalExecutor;
use crate::intake::MediaBuyIntake;
use crate::steps::WorkflowStepManager;
use async_trait::async_trait;
use buyline_adserver::SimulatedAdServer;
use buyline_notify::{
    BuyerNotifier, NotifyError, NotifyResult, OperatorNotifier, StepNotice, TaskNotification,
};
use buyline_storage::{
    CreativeStore, InMemoryBuylineStorage, MediaBuyFilter, MediaBuyStore, QueryWindow, StepFilter,
    StorageError, StorageResult, WorkflowStore,
};
use buyline_types::{
    AutomationMode, Creative, CreativeAssignment, CreativeId, CreativeStatus, FlightWindow,
    MediaBuy, MediaBuyId, MediaBuyRequest, MediaBuyStatus, ObjectType, ObjectWorkflowMapping,
    PackageRequest, ProductConfig, PushConfig, StepComment, WorkflowStep, WorkflowStepId,
    WorkflowStepStatus,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Fixed instant all workflow tests run at.
pub(crate) fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 15, 12, 0, 0).unwrap()
}

/// Flight that has not opened at `test_now`.
pub(crate) fn future_flight() -> FlightWindow {
    FlightWindow::from_dates(
        NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 8, 31).unwrap(),
    )
}

/// Flight containing `test_now`.
pub(crate) fn open_flight() -> FlightWindow {
    FlightWindow::from_dates(
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
    )
}

pub(crate) fn package(
    id: &str,
    line_item_type: &str,
    automation: AutomationMode,
) -> PackageRequest {
    PackageRequest {
        package_id: id.to_string(),
        name: format!("Package {id}"),
        impressions: 50_000,
        cpm: 8.0,
        product: ProductConfig {
            product_id: format!("prod-{id}"),
            line_item_type: line_item_type.to_string(),
            automation,
        },
        formats: vec!["display_300x250".to_string()],
        targeting: serde_json::json!({"geo": ["us"]}),
    }
}

pub(crate) fn request_with(
    packages: Vec<PackageRequest>,
    flight: FlightWindow,
    push: Option<PushConfig>,
) -> MediaBuyRequest {
    MediaBuyRequest {
        buyer_ref: "po-2025-104".to_string(),
        budget: 25_000.0,
        flight,
        packages,
        push,
    }
}

pub(crate) fn push_config() -> PushConfig {
    PushConfig {
        url: "http://127.0.0.1:9/push".to_string(),
        auth_token: None,
    }
}

/// Assign one freshly approved creative to every package of the buy.
pub(crate) async fn approve_creatives(storage: &InMemoryBuylineStorage, buy: &MediaBuy) {
    let now = test_now();
    let mut assignments = Vec::new();
    for package in &buy.request.packages {
        let creative = Creative {
            id: CreativeId::generate(),
            tenant_id: buy.tenant_id.clone(),
            principal_id: buy.principal_id.clone(),
            name: format!("Creative for {}", package.package_id),
            format: "display_300x250".to_string(),
            status: CreativeStatus::Approved,
            created_at: now,
            updated_at: now,
        };
        assignments.push(CreativeAssignment {
            media_buy_id: buy.id.clone(),
            package_id: package.package_id.clone(),
            creative_id: creative.id.clone(),
            created_at: now,
        });
        storage.upsert_creative(creative).await.unwrap();
    }
    storage
        .replace_assignments(&buy.id, assignments)
        .await
        .unwrap();
}

/// Operator notifier fake that counts calls and can be told to fail.
#[derive(Default)]
pub(crate) struct CountingOperatorNotifier {
    pub(crate) sent: AtomicU64,
    pub(crate) fail: AtomicBool,
}

#[async_trait]
impl OperatorNotifier for CountingOperatorNotifier {
    async fn notify(&self, _notice: &StepNotice) -> NotifyResult<()> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Send("operator channel down".to_string()));
        }
        Ok(())
    }
}

/// Buyer notifier fake that records every pushed notification.
#[derive(Default)]
pub(crate) struct CountingBuyerNotifier {
    pub(crate) sent: Mutex<Vec<TaskNotification>>,
    pub(crate) fail: AtomicBool,
}

#[async_trait]
impl BuyerNotifier for CountingBuyerNotifier {
    async fn send_notification(
        &self,
        _push: &PushConfig,
        notification: &TaskNotification,
    ) -> NotifyResult<()> {
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(notification.clone());
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Send("webhook endpoint down".to_string()));
        }
        Ok(())
    }
}

/// Storage wrapper whose `decide_step` always reports a version
/// conflict, for exercising retry exhaustion. Everything else passes
/// through to the wrapped store.
pub(crate) struct ConflictingStorage {
    inner: Arc<InMemoryBuylineStorage>,
    pub(crate) decide_calls: AtomicU64,
}

impl ConflictingStorage {
    pub(crate) fn wrapping(inner: Arc<InMemoryBuylineStorage>) -> Self {
        Self {
            inner,
            decide_calls: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl MediaBuyStore for ConflictingStorage {
    async fn create_media_buy(&self, buy: MediaBuy) -> StorageResult<()> {
        self.inner.create_media_buy(buy).await
    }

    async fn get_media_buy(&self, id: &MediaBuyId) -> StorageResult<Option<MediaBuy>> {
        self.inner.get_media_buy(id).await
    }

    async fn list_media_buys(
        &self,
        filter: MediaBuyFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<MediaBuy>> {
        self.inner.list_media_buys(filter, window).await
    }

    async fn transition_media_buy(
        &self,
        id: &MediaBuyId,
        expected_from: MediaBuyStatus,
        to: MediaBuyStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.inner
            .transition_media_buy(id, expected_from, to, updated_at)
            .await
    }

    async fn set_media_buy_status(
        &self,
        id: &MediaBuyId,
        to: MediaBuyStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.inner.set_media_buy_status(id, to, updated_at).await
    }

    async fn set_external_order_id(
        &self,
        id: &MediaBuyId,
        external_order_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.inner
            .set_external_order_id(id, external_order_id, updated_at)
            .await
    }
}

#[async_trait]
impl CreativeStore for ConflictingStorage {
    async fn upsert_creative(&self, creative: Creative) -> StorageResult<()> {
        self.inner.upsert_creative(creative).await
    }

    async fn get_creative(&self, id: &CreativeId) -> StorageResult<Option<Creative>> {
        self.inner.get_creative(id).await
    }

    async fn set_creative_status(
        &self,
        id: &CreativeId,
        status: CreativeStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.inner.set_creative_status(id, status, updated_at).await
    }

    async fn replace_assignments(
        &self,
        media_buy_id: &MediaBuyId,
        assignments: Vec<CreativeAssignment>,
    ) -> StorageResult<()> {
        self.inner.replace_assignments(media_buy_id, assignments).await
    }

    async fn list_assignments(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> StorageResult<Vec<CreativeAssignment>> {
        self.inner.list_assignments(media_buy_id).await
    }

    async fn list_creatives_for_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> StorageResult<Vec<Creative>> {
        self.inner.list_creatives_for_buy(media_buy_id).await
    }
}

#[async_trait]
impl WorkflowStore for ConflictingStorage {
    async fn create_step(
        &self,
        step: WorkflowStep,
        mapping: ObjectWorkflowMapping,
    ) -> StorageResult<()> {
        self.inner.create_step(step, mapping).await
    }

    async fn get_step(&self, id: &WorkflowStepId) -> StorageResult<Option<WorkflowStep>> {
        self.inner.get_step(id).await
    }

    async fn list_steps(
        &self,
        filter: StepFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<WorkflowStep>> {
        self.inner.list_steps(filter, window).await
    }

    async fn decide_step(
        &self,
        id: &WorkflowStepId,
        _expected_version: u64,
        _new_status: WorkflowStepStatus,
        _comment: StepComment,
        _updated_at: DateTime<Utc>,
    ) -> StorageResult<WorkflowStep> {
        self.decide_calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Conflict(format!(
            "workflow step {id} version conflict: injected"
        )))
    }

    async fn steps_for_object(
        &self,
        object_type: ObjectType,
        object_id: &str,
    ) -> StorageResult<Vec<WorkflowStep>> {
        self.inner.steps_for_object(object_type, object_id).await
    }
}

/// One in-memory deployment of the workflow layer.
pub(crate) struct Harness {
    pub(crate) storage: Arc<InMemoryBuylineStorage>,
    pub(crate) adserver: Arc<SimulatedAdServer>,
    pub(crate) operator: Arc<CountingOperatorNotifier>,
    pub(crate) buyer: Arc<CountingBuyerNotifier>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self {
            storage: Arc::new(InMemoryBuylineStorage::new()),
            adserver: Arc::new(SimulatedAdServer::new()),
            operator: Arc::new(CountingOperatorNotifier::default()),
            buyer: Arc::new(CountingBuyerNotifier::default()),
        }
    }

    pub(crate) fn intake(&self) -> MediaBuyIntake {
        let steps = WorkflowStepManager::new(self.storage.clone(), self.operator.clone());
        MediaBuyIntake::new(self.storage.clone(), self.adserver.clone(), steps)
    }

    pub(crate) fn executor(&self) -> ApprovalExecutor {
        ApprovalExecutor::new(
            self.storage.clone(),
            self.adserver.clone(),
            self.buyer.clone(),
        )
    }
}
