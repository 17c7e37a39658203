//! Media buy handlers: intake, lookup, readiness, creative sync, and
//! the operator pause/resume toggles.

use super::tenant_from_headers;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use buyline_readiness::ReadinessDetails;
use buyline_storage::{MediaBuyFilter, QueryWindow, StorageError};
use buyline_types::{
    Creative, CreativeAssignment, CreativeId, CreativeStatus, MediaBuy, MediaBuyId,
    MediaBuyRequest, MediaBuyStatus, PrincipalId,
};
use serde::{Deserialize, Serialize};

/// Create media buy request
#[derive(Debug, Deserialize)]
pub struct CreateMediaBuyRequest {
    /// Buyer principal submitting the buy.
    pub principal_id: String,
    #[serde(flatten)]
    pub request: MediaBuyRequest,
}

/// Create media buy response
#[derive(Debug, Serialize)]
pub struct CreateMediaBuyResponse {
    #[serde(flatten)]
    pub media_buy: MediaBuy,
    pub automation_mode: String,
    pub automation_reason: buyline_policy::ResolutionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter_error: Option<String>,
}

/// Accept a media buy and run its automation path
pub async fn create_media_buy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateMediaBuyRequest>,
) -> ApiResult<(StatusCode, Json<CreateMediaBuyResponse>)> {
    let tenant_id = tenant_from_headers(&headers)?;
    if body.principal_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "principal_id must not be empty".to_string(),
        ));
    }

    let outcome = state
        .intake
        .create_media_buy(
            tenant_id,
            PrincipalId::new(body.principal_id),
            body.request,
            chrono::Utc::now(),
        )
        .await?;

    let response = CreateMediaBuyResponse {
        automation_mode: outcome.resolution.mode.to_string(),
        automation_reason: outcome.resolution.reason,
        step_id: outcome.step.map(|s| s.id.to_string()),
        adapter_error: outcome.adapter_error,
        media_buy: outcome.buy,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Media buy list query parameters
#[derive(Debug, Deserialize)]
pub struct MediaBuyListQuery {
    #[serde(default)]
    pub principal: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// List media buys for the caller's tenant, newest first
pub async fn list_media_buys(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MediaBuyListQuery>,
) -> ApiResult<Json<Vec<MediaBuy>>> {
    let tenant_id = tenant_from_headers(&headers)?;

    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => Some(
            MediaBuyStatus::parse_str(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status `{raw}`")))?,
        ),
    };

    let filter = MediaBuyFilter {
        tenant_id: Some(tenant_id),
        principal_id: query.principal.map(PrincipalId::new),
        status,
    };
    let window = QueryWindow {
        limit: query.limit,
        offset: query.offset,
    };

    let buys = state.storage.list_media_buys(filter, window).await?;
    Ok(Json(buys))
}

/// Get a specific media buy
pub async fn get_media_buy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<MediaBuy>> {
    let tenant_id = tenant_from_headers(&headers)?;
    let buy = load_scoped_buy(&state, &tenant_id, &id).await?;
    Ok(Json(buy))
}

/// Readiness response wraps the derived snapshot with the buy's id.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub media_buy_id: String,
    pub status: MediaBuyStatus,
    #[serde(flatten)]
    pub readiness: ReadinessDetails,
}

/// Derive the media buy's operational readiness at now
pub async fn get_readiness(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<ReadinessResponse>> {
    let tenant_id = tenant_from_headers(&headers)?;
    let buy = load_scoped_buy(&state, &tenant_id, &id).await?;

    let assignments = state.storage.list_assignments(&buy.id).await?;
    let creatives = state.storage.list_creatives_for_buy(&buy.id).await?;
    let readiness = buyline_readiness::compute(
        &buy,
        &buy.request.packages,
        &assignments,
        &creatives,
        chrono::Utc::now(),
    );

    Ok(Json(ReadinessResponse {
        media_buy_id: buy.id.to_string(),
        status: buy.status,
        readiness,
    }))
}

/// One creative in a sync request
#[derive(Debug, Deserialize)]
pub struct CreativeSync {
    /// Existing creative id to update; omitted means a new creative.
    #[serde(default)]
    pub creative_id: Option<String>,
    pub name: String,
    pub format: String,
    /// Packages this creative serves on.
    pub package_ids: Vec<String>,
    /// Review status. New creatives default to `pending`.
    #[serde(default)]
    pub status: Option<CreativeStatus>,
}

/// Creative sync request. The assignment set is declarative: packages
/// not named here lose their assignments.
#[derive(Debug, Deserialize)]
pub struct SyncCreativesRequest {
    pub creatives: Vec<CreativeSync>,
}

/// Creative sync response
#[derive(Debug, Serialize)]
pub struct SyncCreativesResponse {
    pub media_buy_id: String,
    pub creative_count: usize,
    pub assignment_count: usize,
    pub readiness: ReadinessDetails,
}

/// Replace the buy's creatives and assignments in one shot
pub async fn sync_creatives(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SyncCreativesRequest>,
) -> ApiResult<Json<SyncCreativesResponse>> {
    let tenant_id = tenant_from_headers(&headers)?;
    let buy = load_scoped_buy(&state, &tenant_id, &id).await?;
    let now = chrono::Utc::now();

    let mut assignments = Vec::new();
    let mut creative_count = 0;
    for sync in body.creatives {
        let creative_id = match sync.creative_id.as_deref() {
            Some(raw) => CreativeId::parse_str(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid creative id `{raw}`")))?,
            None => CreativeId::generate(),
        };
        for package_id in &sync.package_ids {
            if !buy
                .request
                .packages
                .iter()
                .any(|p| &p.package_id == package_id)
            {
                return Err(ApiError::BadRequest(format!(
                    "package `{package_id}` is not part of media buy {id}"
                )));
            }
            assignments.push(CreativeAssignment {
                media_buy_id: buy.id.clone(),
                package_id: package_id.clone(),
                creative_id: creative_id.clone(),
                created_at: now,
            });
        }

        let existing = state.storage.get_creative(&creative_id).await?;
        let creative = Creative {
            id: creative_id,
            tenant_id: buy.tenant_id.clone(),
            principal_id: buy.principal_id.clone(),
            name: sync.name,
            format: sync.format,
            status: sync
                .status
                .or(existing.map(|c| c.status))
                .unwrap_or(CreativeStatus::Pending),
            created_at: now,
            updated_at: now,
        };
        state.storage.upsert_creative(creative).await?;
        creative_count += 1;
    }

    let assignment_count = assignments.len();
    state
        .storage
        .replace_assignments(&buy.id, assignments)
        .await?;

    tracing::info!(
        media_buy_id = %buy.id,
        creatives = creative_count,
        assignments = assignment_count,
        "Synced creatives"
    );

    let assignments = state.storage.list_assignments(&buy.id).await?;
    let creatives = state.storage.list_creatives_for_buy(&buy.id).await?;
    let readiness = buyline_readiness::compute(
        &buy,
        &buy.request.packages,
        &assignments,
        &creatives,
        now,
    );

    Ok(Json(SyncCreativesResponse {
        media_buy_id: buy.id.to_string(),
        creative_count,
        assignment_count,
        readiness,
    }))
}

/// Status change response for pause/resume
#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub media_buy_id: String,
    pub status: MediaBuyStatus,
}

/// Pause a delivering media buy
pub async fn pause_media_buy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusChangeResponse>> {
    toggle_status(&state, &headers, &id, MediaBuyStatus::Active, MediaBuyStatus::Paused).await
}

/// Resume a paused media buy
pub async fn resume_media_buy(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusChangeResponse>> {
    toggle_status(&state, &headers, &id, MediaBuyStatus::Paused, MediaBuyStatus::Active).await
}

async fn toggle_status(
    state: &AppState,
    headers: &HeaderMap,
    id: &str,
    from: MediaBuyStatus,
    to: MediaBuyStatus,
) -> ApiResult<Json<StatusChangeResponse>> {
    let tenant_id = tenant_from_headers(headers)?;
    let buy = load_scoped_buy(state, &tenant_id, id).await?;

    match state
        .storage
        .transition_media_buy(&buy.id, from, to, chrono::Utc::now())
        .await
    {
        Ok(()) => {
            tracing::info!(media_buy_id = %buy.id, status = %to, "Operator status change");
            Ok(Json(StatusChangeResponse {
                media_buy_id: buy.id.to_string(),
                status: to,
            }))
        }
        Err(StorageError::InvariantViolation(detail)) => Err(ApiError::Conflict(detail)),
        Err(err) => Err(err.into()),
    }
}

/// Load a buy and enforce tenant scoping. A buy belonging to another
/// tenant reads as absent.
pub(super) async fn load_scoped_buy(
    state: &AppState,
    tenant_id: &buyline_types::TenantId,
    raw_id: &str,
) -> ApiResult<MediaBuy> {
    let id = MediaBuyId::parse_str(raw_id)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid media buy id `{raw_id}`")))?;
    let buy = state
        .storage
        .get_media_buy(&id)
        .await?
        .filter(|buy| &buy.tenant_id == tenant_id)
        .ok_or_else(|| ApiError::NotFound(format!("media buy {raw_id} not found")))?;
    Ok(buy)
}
