use crate::StorageResult;
use async_trait::async_trait;
use buyline_types::{
    Creative, CreativeAssignment, CreativeId, CreativeStatus, MediaBuy, MediaBuyId,
    MediaBuyStatus, ObjectType, ObjectWorkflowMapping, PrincipalId, StepComment, TenantId,
    WorkflowStep, WorkflowStepId, WorkflowStepStatus,
};
use chrono::{DateTime, Utc};

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Filter for media buy listings. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct MediaBuyFilter {
    pub tenant_id: Option<TenantId>,
    pub principal_id: Option<PrincipalId>,
    pub status: Option<MediaBuyStatus>,
}

/// Filter for workflow step listings. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct StepFilter {
    pub tenant_id: Option<TenantId>,
    pub status: Option<WorkflowStepStatus>,
    pub owner: Option<String>,
}

/// Storage interface for media buy records.
#[async_trait]
pub trait MediaBuyStore: Send + Sync {
    /// Insert a new media buy. Fails with a conflict if the id exists.
    async fn create_media_buy(&self, buy: MediaBuy) -> StorageResult<()>;

    /// Get one media buy by id.
    async fn get_media_buy(&self, id: &MediaBuyId) -> StorageResult<Option<MediaBuy>>;

    /// List buys newest-first.
    async fn list_media_buys(
        &self,
        filter: MediaBuyFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<MediaBuy>>;

    /// Transition status from one state to another. The write applies
    /// only if the persisted status matches `expected_from`.
    async fn transition_media_buy(
        &self,
        id: &MediaBuyId,
        expected_from: MediaBuyStatus,
        to: MediaBuyStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Unconditional status write, used when an external outcome (not
    /// another writer) dictates the new state.
    async fn set_media_buy_status(
        &self,
        id: &MediaBuyId,
        to: MediaBuyStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Record the order id handed back by the ad server.
    async fn set_external_order_id(
        &self,
        id: &MediaBuyId,
        external_order_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()>;
}

/// Storage interface for creatives and their package assignments.
#[async_trait]
pub trait CreativeStore: Send + Sync {
    async fn upsert_creative(&self, creative: Creative) -> StorageResult<()>;

    async fn get_creative(&self, id: &CreativeId) -> StorageResult<Option<Creative>>;

    async fn set_creative_status(
        &self,
        id: &CreativeId,
        status: CreativeStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Replace every assignment row for a media buy in one shot.
    /// Creative sync is declarative: the new set wins.
    async fn replace_assignments(
        &self,
        media_buy_id: &MediaBuyId,
        assignments: Vec<CreativeAssignment>,
    ) -> StorageResult<()>;

    async fn list_assignments(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> StorageResult<Vec<CreativeAssignment>>;

    /// Creatives referenced by a buy's current assignments.
    async fn list_creatives_for_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> StorageResult<Vec<Creative>>;
}

/// Storage interface for workflow steps and object mappings.
///
/// Steps are never deleted; they are the audit trail for every human
/// decision the system has asked for.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Persist a step together with the mapping that ties it to the
    /// object it gates. Fails with a conflict if the step id exists.
    async fn create_step(
        &self,
        step: WorkflowStep,
        mapping: ObjectWorkflowMapping,
    ) -> StorageResult<()>;

    async fn get_step(&self, id: &WorkflowStepId) -> StorageResult<Option<WorkflowStep>>;

    /// List steps newest-first.
    async fn list_steps(
        &self,
        filter: StepFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<WorkflowStep>>;

    /// Apply a decision to a step as one atomic compare-and-swap: the
    /// status write, the comment append, and the version bump all land
    /// together or not at all.
    ///
    /// Fails with `Conflict` when the persisted version differs from
    /// `expected_version`, with `InvariantViolation` when the step is
    /// not awaiting a decision, and with `NotFound` when it is missing.
    /// Returns the updated step on success.
    async fn decide_step(
        &self,
        id: &WorkflowStepId,
        expected_version: u64,
        new_status: WorkflowStepStatus,
        comment: StepComment,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<WorkflowStep>;

    /// Steps linked to a business object, newest-first. Answers "what
    /// is blocking this object" without scanning all steps.
    async fn steps_for_object(
        &self,
        object_type: ObjectType,
        object_id: &str,
    ) -> StorageResult<Vec<WorkflowStep>>;
}

/// Unified storage bundle used by the buyline daemon and workflow layer.
pub trait BuylineStorage: MediaBuyStore + CreativeStore + WorkflowStore + Send + Sync {}

impl<T> BuylineStorage for T where T: MediaBuyStore + CreativeStore + WorkflowStore + Send + Sync {}
