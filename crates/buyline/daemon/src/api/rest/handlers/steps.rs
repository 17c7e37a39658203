//! Workflow step handlers: the approval queue surface.
//!
//! The decision endpoint is the single write path for human decisions.
//! Contention outcomes map to dedicated status codes so clients can
//! distinguish "re-read and retry" from "someone already decided".

use super::tenant_from_headers;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use buyline_storage::{QueryWindow, StepFilter};
use buyline_types::{
    DecisionAction, MediaBuyStatus, ObjectType, StepComment, WorkflowStep, WorkflowStepId,
    WorkflowStepStatus,
};
use buyline_workflow::{DecisionOutcome, DecisionRequest};
use serde::{Deserialize, Serialize};

/// Step list query parameters
#[derive(Debug, Deserialize)]
pub struct StepListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// List workflow steps for the caller's tenant, newest first
pub async fn list_steps(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StepListQuery>,
) -> ApiResult<Json<Vec<WorkflowStep>>> {
    let tenant_id = tenant_from_headers(&headers)?;

    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            WorkflowStepStatus::parse_str(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status `{raw}`")))?,
        ),
    };

    let filter = StepFilter {
        tenant_id: Some(tenant_id),
        status,
        owner: query.owner,
    };
    let window = QueryWindow {
        limit: query.limit,
        offset: query.offset,
    };

    let steps = state.storage.list_steps(filter, window).await?;
    Ok(Json(steps))
}

/// Get a specific workflow step
pub async fn get_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowStep>> {
    let tenant_id = tenant_from_headers(&headers)?;
    let step = load_scoped_step(&state, &tenant_id, &id).await?;
    Ok(Json(step))
}

/// Get a step's comment log, oldest first
pub async fn get_step_comments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<StepComment>>> {
    let tenant_id = tenant_from_headers(&headers)?;
    let step = load_scoped_step(&state, &tenant_id, &id).await?;
    Ok(Json(step.comments))
}

/// Decision request body
#[derive(Debug, Deserialize)]
pub struct DecideStepRequest {
    /// Version the caller last read. Guards against deciding on stale
    /// state.
    pub expected_version: u64,
    /// `approve` or `reject`.
    pub action: String,
    /// Human recorded as the decision's author.
    pub actor: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Decision response
#[derive(Debug, Serialize)]
pub struct DecideStepResponse {
    pub step_id: String,
    pub step_status: WorkflowStepStatus,
    pub step_version: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_buy_status: Option<MediaBuyStatus>,
    /// Downstream ad server failure. The decision itself stands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_error: Option<String>,
}

/// Apply a human decision to a workflow step
pub async fn decide_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<DecideStepRequest>,
) -> ApiResult<Json<DecideStepResponse>> {
    let tenant_id = tenant_from_headers(&headers)?;
    let action = DecisionAction::parse_str(&body.action).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "unknown action `{}`, expected approve or reject",
            body.action
        ))
    })?;

    // Tenant scoping happens on this read; the executor re-reads under
    // its own concurrency protocol.
    let step = load_scoped_step(&state, &tenant_id, &id).await?;

    let request = DecisionRequest {
        step_id: &step.id,
        expected_version: body.expected_version,
        action,
        actor: &body.actor,
        reason: body.reason.as_deref(),
    };
    let outcome = state.executor.decide(request, chrono::Utc::now()).await?;
    map_decision_outcome(&id, outcome).map(Json)
}

fn map_decision_outcome(
    raw_id: &str,
    outcome: DecisionOutcome,
) -> Result<DecideStepResponse, ApiError> {
    match outcome {
        DecisionOutcome::Ok(receipt) => Ok(DecideStepResponse {
            step_id: receipt.step.id.to_string(),
            step_status: receipt.step.status,
            step_version: receipt.step.version,
            media_buy_status: receipt.media_buy_status,
            adapter_error: receipt.adapter_error,
        }),
        DecisionOutcome::Conflict => Err(ApiError::Conflict(format!(
            "workflow step {raw_id} was modified by another actor, please retry"
        ))),
        DecisionOutcome::NotFound => Err(ApiError::NotFound(format!(
            "workflow step {raw_id} not found"
        ))),
        DecisionOutcome::AlreadyDecided { status } => Err(ApiError::AlreadyDecided(format!(
            "workflow step {raw_id} already carries a decision (status {status})"
        ))),
        DecisionOutcome::Invalid { reason } => Err(ApiError::BadRequest(reason)),
    }
}

/// Blocking-steps lookup for a business object
pub async fn get_blocking_steps(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((object_type, object_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<WorkflowStep>>> {
    let tenant_id = tenant_from_headers(&headers)?;
    let object_type = ObjectType::parse_str(&object_type)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown object type `{object_type}`")))?;

    let steps = state
        .storage
        .steps_for_object(object_type, &object_id)
        .await?;
    let steps = steps
        .into_iter()
        .filter(|step| step.tenant_id == tenant_id)
        .collect();
    Ok(Json(steps))
}

async fn load_scoped_step(
    state: &AppState,
    tenant_id: &buyline_types::TenantId,
    raw_id: &str,
) -> ApiResult<WorkflowStep> {
    let id = WorkflowStepId::parse_str(raw_id)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid workflow step id `{raw_id}`")))?;
    let step = state
        .storage
        .get_step(&id)
        .await?
        .filter(|step| &step.tenant_id == tenant_id)
        .ok_or_else(|| ApiError::NotFound(format!("workflow step {raw_id} not found")))?;
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use buyline_types::{PrincipalId, StepRequestPayload, StepType, TenantId};
    use buyline_workflow::DecisionReceipt;
    use chrono::Utc;

    fn sample_step() -> WorkflowStep {
        let mut step = WorkflowStep::awaiting_approval(
            TenantId::new("default"),
            PrincipalId::new("buyer-1"),
            StepType::Approval,
            "publisher",
            "Review order ord-1",
            StepRequestPayload::ActivationApproval {
                media_buy_id: buyline_types::MediaBuyId::generate(),
                external_order_id: "ord-1".to_string(),
                order_url: None,
                packages: Vec::new(),
            },
            Utc::now(),
        );
        step.status = WorkflowStepStatus::Completed;
        step.version = 2;
        step
    }

    #[test]
    fn test_landed_decision_maps_to_response() {
        let step = sample_step();
        let id = step.id.to_string();
        let outcome = DecisionOutcome::Ok(DecisionReceipt {
            step,
            media_buy_status: Some(MediaBuyStatus::Scheduled),
            adapter_error: None,
        });

        let response = map_decision_outcome(&id, outcome).unwrap();
        assert_eq!(response.step_version, 2);
        assert_eq!(response.step_status, WorkflowStepStatus::Completed);
        assert_eq!(response.media_buy_status, Some(MediaBuyStatus::Scheduled));
    }

    #[test]
    fn test_conflict_maps_to_retryable_conflict() {
        let err = map_decision_outcome("step-1", DecisionOutcome::Conflict).unwrap_err();
        match err {
            ApiError::Conflict(message) => assert!(message.contains("please retry")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_already_decided_maps_to_dedicated_error() {
        let outcome = DecisionOutcome::AlreadyDecided {
            status: WorkflowStepStatus::Rejected,
        };
        let err = map_decision_outcome("step-1", outcome).unwrap_err();
        match err {
            ApiError::AlreadyDecided(message) => assert!(message.contains("rejected")),
            other => panic!("expected already-decided, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_maps_to_bad_request() {
        let outcome = DecisionOutcome::Invalid {
            reason: "expected_version must be at least 1".to_string(),
        };
        let err = map_decision_outcome("step-1", outcome).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
