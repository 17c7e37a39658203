//! In-memory adapter for the buyline storage traits.
//!
//! This adapter is deterministic and test-friendly. Production
//! deployments should use the PostgreSQL backend for source-of-truth
//! data.

use crate::traits::{
    CreativeStore, MediaBuyFilter, MediaBuyStore, QueryWindow, StepFilter, WorkflowStore,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use buyline_types::{
    Creative, CreativeAssignment, CreativeId, CreativeStatus, MediaBuy, MediaBuyId,
    MediaBuyStatus, ObjectType, ObjectWorkflowMapping, StepComment, WorkflowStep, WorkflowStepId,
    WorkflowStepStatus,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory buyline storage adapter.
#[derive(Default)]
pub struct InMemoryBuylineStorage {
    media_buys: RwLock<HashMap<MediaBuyId, MediaBuy>>,
    creatives: RwLock<HashMap<CreativeId, Creative>>,
    assignments: RwLock<Vec<CreativeAssignment>>,
    steps: RwLock<HashMap<WorkflowStepId, WorkflowStep>>,
    mappings: RwLock<Vec<ObjectWorkflowMapping>>,
}

impl InMemoryBuylineStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaBuyStore for InMemoryBuylineStorage {
    async fn create_media_buy(&self, buy: MediaBuy) -> StorageResult<()> {
        let mut guard = self
            .media_buys
            .write()
            .map_err(|_| StorageError::Backend("media buy lock poisoned".to_string()))?;

        if guard.contains_key(&buy.id) {
            return Err(StorageError::Conflict(format!(
                "media buy {} already exists",
                buy.id
            )));
        }

        guard.insert(buy.id.clone(), buy);
        Ok(())
    }

    async fn get_media_buy(&self, id: &MediaBuyId) -> StorageResult<Option<MediaBuy>> {
        let guard = self
            .media_buys
            .read()
            .map_err(|_| StorageError::Backend("media buy lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn list_media_buys(
        &self,
        filter: MediaBuyFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<MediaBuy>> {
        let guard = self
            .media_buys
            .read()
            .map_err(|_| StorageError::Backend("media buy lock poisoned".to_string()))?;
        let mut values = guard
            .values()
            .filter(|buy| {
                filter
                    .tenant_id
                    .as_ref()
                    .map(|t| &buy.tenant_id == t)
                    .unwrap_or(true)
                    && filter
                        .principal_id
                        .as_ref()
                        .map(|p| &buy.principal_id == p)
                        .unwrap_or(true)
                    && filter.status.map(|s| buy.status == s).unwrap_or(true)
            })
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(apply_window(values, window))
    }

    async fn transition_media_buy(
        &self,
        id: &MediaBuyId,
        expected_from: MediaBuyStatus,
        to: MediaBuyStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut guard = self
            .media_buys
            .write()
            .map_err(|_| StorageError::Backend("media buy lock poisoned".to_string()))?;
        let buy = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("media buy {} not found", id)))?;

        if buy.status != expected_from {
            return Err(StorageError::InvariantViolation(format!(
                "invalid status transition: expected {}, found {}",
                expected_from, buy.status
            )));
        }

        buy.status = to;
        buy.updated_at = updated_at;
        Ok(())
    }

    async fn set_media_buy_status(
        &self,
        id: &MediaBuyId,
        to: MediaBuyStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut guard = self
            .media_buys
            .write()
            .map_err(|_| StorageError::Backend("media buy lock poisoned".to_string()))?;
        let buy = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("media buy {} not found", id)))?;
        buy.status = to;
        buy.updated_at = updated_at;
        Ok(())
    }

    async fn set_external_order_id(
        &self,
        id: &MediaBuyId,
        external_order_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut guard = self
            .media_buys
            .write()
            .map_err(|_| StorageError::Backend("media buy lock poisoned".to_string()))?;
        let buy = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("media buy {} not found", id)))?;
        buy.external_order_id = Some(external_order_id.to_string());
        buy.updated_at = updated_at;
        Ok(())
    }
}

#[async_trait]
impl CreativeStore for InMemoryBuylineStorage {
    async fn upsert_creative(&self, creative: Creative) -> StorageResult<()> {
        let mut guard = self
            .creatives
            .write()
            .map_err(|_| StorageError::Backend("creative lock poisoned".to_string()))?;
        guard.insert(creative.id.clone(), creative);
        Ok(())
    }

    async fn get_creative(&self, id: &CreativeId) -> StorageResult<Option<Creative>> {
        let guard = self
            .creatives
            .read()
            .map_err(|_| StorageError::Backend("creative lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn set_creative_status(
        &self,
        id: &CreativeId,
        status: CreativeStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let mut guard = self
            .creatives
            .write()
            .map_err(|_| StorageError::Backend("creative lock poisoned".to_string()))?;
        let creative = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("creative {} not found", id)))?;
        creative.status = status;
        creative.updated_at = updated_at;
        Ok(())
    }

    async fn replace_assignments(
        &self,
        media_buy_id: &MediaBuyId,
        assignments: Vec<CreativeAssignment>,
    ) -> StorageResult<()> {
        for assignment in &assignments {
            if &assignment.media_buy_id != media_buy_id {
                return Err(StorageError::InvalidInput(format!(
                    "assignment for {} does not belong to {}",
                    assignment.media_buy_id, media_buy_id
                )));
            }
        }

        let mut guard = self
            .assignments
            .write()
            .map_err(|_| StorageError::Backend("assignment lock poisoned".to_string()))?;
        guard.retain(|a| &a.media_buy_id != media_buy_id);
        guard.extend(assignments);
        Ok(())
    }

    async fn list_assignments(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> StorageResult<Vec<CreativeAssignment>> {
        let guard = self
            .assignments
            .read()
            .map_err(|_| StorageError::Backend("assignment lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|a| &a.media_buy_id == media_buy_id)
            .cloned()
            .collect())
    }

    async fn list_creatives_for_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> StorageResult<Vec<Creative>> {
        let assignments = self.list_assignments(media_buy_id).await?;
        let guard = self
            .creatives
            .read()
            .map_err(|_| StorageError::Backend("creative lock poisoned".to_string()))?;

        let mut seen = Vec::new();
        let mut creatives = Vec::new();
        for assignment in assignments {
            if seen.contains(&assignment.creative_id) {
                continue;
            }
            if let Some(creative) = guard.get(&assignment.creative_id) {
                creatives.push(creative.clone());
            }
            seen.push(assignment.creative_id);
        }
        Ok(creatives)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryBuylineStorage {
    async fn create_step(
        &self,
        step: WorkflowStep,
        mapping: ObjectWorkflowMapping,
    ) -> StorageResult<()> {
        let mut steps = self
            .steps
            .write()
            .map_err(|_| StorageError::Backend("step lock poisoned".to_string()))?;

        if steps.contains_key(&step.id) {
            return Err(StorageError::Conflict(format!(
                "workflow step {} already exists",
                step.id
            )));
        }

        steps.insert(step.id.clone(), step);

        let mut mappings = self
            .mappings
            .write()
            .map_err(|_| StorageError::Backend("mapping lock poisoned".to_string()))?;
        mappings.push(mapping);
        Ok(())
    }

    async fn get_step(&self, id: &WorkflowStepId) -> StorageResult<Option<WorkflowStep>> {
        let guard = self
            .steps
            .read()
            .map_err(|_| StorageError::Backend("step lock poisoned".to_string()))?;
        Ok(guard.get(id).cloned())
    }

    async fn list_steps(
        &self,
        filter: StepFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<WorkflowStep>> {
        let guard = self
            .steps
            .read()
            .map_err(|_| StorageError::Backend("step lock poisoned".to_string()))?;
        let mut values = guard
            .values()
            .filter(|step| {
                filter
                    .tenant_id
                    .as_ref()
                    .map(|t| &step.tenant_id == t)
                    .unwrap_or(true)
                    && filter.status.map(|s| step.status == s).unwrap_or(true)
                    && filter
                        .owner
                        .as_ref()
                        .map(|o| &step.owner == o)
                        .unwrap_or(true)
            })
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(apply_window(values, window))
    }

    async fn decide_step(
        &self,
        id: &WorkflowStepId,
        expected_version: u64,
        new_status: WorkflowStepStatus,
        comment: StepComment,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<WorkflowStep> {
        let mut guard = self
            .steps
            .write()
            .map_err(|_| StorageError::Backend("step lock poisoned".to_string()))?;
        let step = guard
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("workflow step {} not found", id)))?;

        if step.version != expected_version {
            return Err(StorageError::Conflict(format!(
                "workflow step {} version conflict: expected {}, found {}",
                id, expected_version, step.version
            )));
        }

        if !step.status.awaits_decision() {
            return Err(StorageError::InvariantViolation(format!(
                "workflow step {} is not awaiting a decision (status {})",
                id, step.status
            )));
        }

        step.status = new_status;
        step.comments.push(comment);
        step.version += 1;
        step.updated_at = updated_at;
        Ok(step.clone())
    }

    async fn steps_for_object(
        &self,
        object_type: ObjectType,
        object_id: &str,
    ) -> StorageResult<Vec<WorkflowStep>> {
        let mappings = self
            .mappings
            .read()
            .map_err(|_| StorageError::Backend("mapping lock poisoned".to_string()))?;
        let step_ids: Vec<WorkflowStepId> = mappings
            .iter()
            .filter(|m| m.object_type == object_type && m.object_id == object_id)
            .map(|m| m.step_id.clone())
            .collect();
        drop(mappings);

        let guard = self
            .steps
            .read()
            .map_err(|_| StorageError::Backend("step lock poisoned".to_string()))?;
        let mut values: Vec<WorkflowStep> = step_ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(values)
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buyline_types::{
        FlightWindow, MediaBuyRequest, PrincipalId, StepRequestPayload, StepType, TenantId,
        WorkflowAction,
    };
    use chrono::NaiveDate;

    fn sample_buy(tenant: &str) -> MediaBuy {
        let request = MediaBuyRequest {
            buyer_ref: "po-1".to_string(),
            budget: 5_000.0,
            flight: FlightWindow::from_dates(
                NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
            ),
            packages: vec![],
            push: None,
        };
        MediaBuy::from_request(
            TenantId::new(tenant),
            PrincipalId::new("buyer-1"),
            request,
            Utc::now(),
        )
    }

    fn sample_step(buy: &MediaBuy) -> (WorkflowStep, ObjectWorkflowMapping) {
        let step = WorkflowStep::awaiting_approval(
            buy.tenant_id.clone(),
            buy.principal_id.clone(),
            StepType::Approval,
            "publisher",
            "Review order before activation",
            StepRequestPayload::ActivationApproval {
                media_buy_id: buy.id.clone(),
                external_order_id: "ord-1".to_string(),
                order_url: None,
                packages: vec![],
            },
            Utc::now(),
        );
        let mapping = ObjectWorkflowMapping::for_media_buy(
            &buy.id,
            step.id.clone(),
            WorkflowAction::Activate,
            Utc::now(),
        );
        (step, mapping)
    }

    fn decision_comment(body: &str) -> StepComment {
        StepComment {
            author: "ops@publisher".to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn media_buy_transition_checks_expected_state() {
        let storage = InMemoryBuylineStorage::new();
        let buy = sample_buy("default");
        let id = buy.id.clone();
        storage.create_media_buy(buy).await.unwrap();

        let result = storage
            .transition_media_buy(
                &id,
                MediaBuyStatus::PendingApproval,
                MediaBuyStatus::Rejected,
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(StorageError::InvariantViolation(_))));

        storage
            .transition_media_buy(
                &id,
                MediaBuyStatus::Draft,
                MediaBuyStatus::PendingApproval,
                Utc::now(),
            )
            .await
            .unwrap();
        let stored = storage.get_media_buy(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, MediaBuyStatus::PendingApproval);
    }

    #[tokio::test]
    async fn list_media_buys_filters_by_tenant() {
        let storage = InMemoryBuylineStorage::new();
        storage.create_media_buy(sample_buy("acme")).await.unwrap();
        storage.create_media_buy(sample_buy("acme")).await.unwrap();
        storage.create_media_buy(sample_buy("zenith")).await.unwrap();

        let filter = MediaBuyFilter {
            tenant_id: Some(TenantId::new("acme")),
            ..Default::default()
        };
        let buys = storage
            .list_media_buys(filter, QueryWindow::default())
            .await
            .unwrap();
        assert_eq!(buys.len(), 2);
    }

    #[tokio::test]
    async fn decide_step_rejects_stale_version() {
        let storage = InMemoryBuylineStorage::new();
        let buy = sample_buy("default");
        let (step, mapping) = sample_step(&buy);
        let step_id = step.id.clone();
        storage.create_step(step, mapping).await.unwrap();

        let result = storage
            .decide_step(
                &step_id,
                7,
                WorkflowStepStatus::Approved,
                decision_comment("approved"),
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        // The failed attempt must not have touched the record.
        let stored = storage.get_step(&step_id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert!(stored.comments.is_empty());
    }

    #[tokio::test]
    async fn decide_step_appends_exactly_one_comment() {
        let storage = InMemoryBuylineStorage::new();
        let buy = sample_buy("default");
        let (step, mapping) = sample_step(&buy);
        let step_id = step.id.clone();
        storage.create_step(step, mapping).await.unwrap();

        let updated = storage
            .decide_step(
                &step_id,
                1,
                WorkflowStepStatus::Approved,
                decision_comment("looks good"),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, WorkflowStepStatus::Approved);
        assert_eq!(updated.version, 2);
        assert_eq!(updated.comments.len(), 1);

        // A second decision against the decided step is refused.
        let again = storage
            .decide_step(
                &step_id,
                2,
                WorkflowStepStatus::Rejected,
                decision_comment("changed my mind"),
                Utc::now(),
            )
            .await;
        assert!(matches!(again, Err(StorageError::InvariantViolation(_))));
        let stored = storage.get_step(&step_id).await.unwrap().unwrap();
        assert_eq!(stored.comments.len(), 1);
    }

    #[tokio::test]
    async fn racing_decisions_land_exactly_once() {
        let storage = InMemoryBuylineStorage::new();
        let buy = sample_buy("default");
        let (step, mapping) = sample_step(&buy);
        let step_id = step.id.clone();
        storage.create_step(step, mapping).await.unwrap();

        let (first, second) = tokio::join!(
            storage.decide_step(
                &step_id,
                1,
                WorkflowStepStatus::Approved,
                decision_comment("approve"),
                Utc::now(),
            ),
            storage.decide_step(
                &step_id,
                1,
                WorkflowStepStatus::Rejected,
                decision_comment("reject"),
                Utc::now(),
            ),
        );

        assert_ne!(first.is_ok(), second.is_ok());
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(StorageError::Conflict(_))));

        let stored = storage.get_step(&step_id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.comments.len(), 1);
    }

    #[tokio::test]
    async fn replace_assignments_swaps_the_full_set() {
        let storage = InMemoryBuylineStorage::new();
        let buy = sample_buy("default");
        let creative_a = CreativeId::generate();
        let creative_b = CreativeId::generate();

        let first = vec![CreativeAssignment {
            media_buy_id: buy.id.clone(),
            package_id: "pkg-1".to_string(),
            creative_id: creative_a,
            created_at: Utc::now(),
        }];
        storage
            .replace_assignments(&buy.id, first)
            .await
            .unwrap();

        let second = vec![CreativeAssignment {
            media_buy_id: buy.id.clone(),
            package_id: "pkg-2".to_string(),
            creative_id: creative_b.clone(),
            created_at: Utc::now(),
        }];
        storage
            .replace_assignments(&buy.id, second)
            .await
            .unwrap();

        let assignments = storage.list_assignments(&buy.id).await.unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].package_id, "pkg-2");
        assert_eq!(assignments[0].creative_id, creative_b);
    }

    #[tokio::test]
    async fn steps_for_object_follows_the_mapping() {
        let storage = InMemoryBuylineStorage::new();
        let buy = sample_buy("default");
        let other = sample_buy("default");
        let (step, mapping) = sample_step(&buy);
        let expected_step_id = step.id.clone();
        storage.create_step(step, mapping).await.unwrap();
        let (other_step, other_mapping) = sample_step(&other);
        storage.create_step(other_step, other_mapping).await.unwrap();

        let steps = storage
            .steps_for_object(ObjectType::MediaBuy, &buy.id.to_string())
            .await
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].id, expected_step_id);
    }
}
