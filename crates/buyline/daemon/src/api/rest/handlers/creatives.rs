//! Creative review handler. Review is publisher-side and independent
//! of the media buy state machine; readiness picks the new status up
//! on its next derivation.

use super::tenant_from_headers;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use buyline_types::{Creative, CreativeId, CreativeStatus, DecisionAction};
use serde::Deserialize;

/// Creative review request
#[derive(Debug, Deserialize)]
pub struct ReviewCreativeRequest {
    /// `approve` or `reject`.
    pub action: String,
}

/// Approve or reject a creative
pub async fn review_creative(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ReviewCreativeRequest>,
) -> ApiResult<Json<Creative>> {
    let tenant_id = tenant_from_headers(&headers)?;
    let action = DecisionAction::parse_str(&body.action).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "unknown action `{}`, expected approve or reject",
            body.action
        ))
    })?;

    let creative_id = CreativeId::parse_str(&id)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid creative id `{id}`")))?;
    let creative = state
        .storage
        .get_creative(&creative_id)
        .await?
        .filter(|c| c.tenant_id == tenant_id)
        .ok_or_else(|| ApiError::NotFound(format!("creative {id} not found")))?;

    let status = match action {
        DecisionAction::Approve => CreativeStatus::Approved,
        DecisionAction::Reject => CreativeStatus::Rejected,
    };
    let now = chrono::Utc::now();
    state
        .storage
        .set_creative_status(&creative.id, status, now)
        .await?;

    tracing::info!(creative_id = %creative.id, status = %status, "Creative reviewed");

    Ok(Json(Creative {
        status,
        updated_at: now,
        ..creative
    }))
}
