//! PostgreSQL adapter for buyline storage.
//!
//! This adapter is the transactional source-of-truth backend. Workflow
//! step decisions are written as a single guarded UPDATE so the version
//! check, the comment append, and the status change land atomically.

use crate::traits::{
    CreativeStore, MediaBuyFilter, MediaBuyStore, QueryWindow, StepFilter, WorkflowStore,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use buyline_types::{
    Creative, CreativeAssignment, CreativeId, CreativeStatus, FlightWindow, MediaBuy, MediaBuyId,
    MediaBuyRequest, MediaBuyStatus, ObjectType, ObjectWorkflowMapping, PrincipalId, StepComment,
    StepRequestPayload, StepType, TenantId, WorkflowStep, WorkflowStepId, WorkflowStepStatus,
};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

/// PostgreSQL-backed buyline storage adapter.
#[derive(Clone)]
pub struct PostgresBuylineStorage {
    pool: PgPool,
}

impl PostgresBuylineStorage {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS buyline_media_buys (
                id UUID PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                principal_id TEXT NOT NULL,
                buyer_ref TEXT NOT NULL,
                status TEXT NOT NULL,
                flight JSONB NOT NULL,
                budget DOUBLE PRECISION NOT NULL,
                external_order_id TEXT,
                request JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS buyline_creatives (
                id UUID PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                principal_id TEXT NOT NULL,
                name TEXT NOT NULL,
                format TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS buyline_creative_assignments (
                media_buy_id UUID NOT NULL,
                package_id TEXT NOT NULL,
                creative_id UUID NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (media_buy_id, package_id, creative_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS buyline_workflow_steps (
                id UUID PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                principal_id TEXT NOT NULL,
                step_type TEXT NOT NULL,
                status TEXT NOT NULL,
                owner TEXT NOT NULL,
                assignee TEXT,
                instructions TEXT NOT NULL,
                request JSONB NOT NULL,
                comments JSONB NOT NULL,
                version BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS buyline_object_workflow_mappings (
                object_type TEXT NOT NULL,
                object_id TEXT NOT NULL,
                step_id UUID NOT NULL,
                action TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (object_type, object_id, step_id)
            )
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl MediaBuyStore for PostgresBuylineStorage {
    async fn create_media_buy(&self, buy: MediaBuy) -> StorageResult<()> {
        let flight_json = serde_json::to_value(&buy.flight)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let request_json = serde_json::to_value(&buy.request)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO buyline_media_buys
                (id, tenant_id, principal_id, buyer_ref, status, flight, budget, external_order_id, request, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(*buy.id.as_uuid())
        .bind(buy.tenant_id.as_str())
        .bind(buy.principal_id.as_str())
        .bind(&buy.buyer_ref)
        .bind(buy.status.as_str())
        .bind(flight_json)
        .bind(buy.budget)
        .bind(&buy.external_order_id)
        .bind(request_json)
        .bind(buy.created_at)
        .bind(buy.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;

        Ok(())
    }

    async fn get_media_buy(&self, id: &MediaBuyId) -> StorageResult<Option<MediaBuy>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, principal_id, buyer_ref, status, flight, budget, external_order_id, request, created_at, updated_at
              FROM buyline_media_buys
             WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.map(media_buy_row_to_record).transpose()
    }

    async fn list_media_buys(
        &self,
        filter: MediaBuyFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<MediaBuy>> {
        let tenant = filter.tenant_id.as_ref().map(|t| t.as_str().to_string());
        let principal = filter.principal_id.as_ref().map(|p| p.as_str().to_string());
        let status = filter.status.map(|s| s.as_str().to_string());

        let rows = if window.limit == 0 {
            sqlx::query(
                r#"
                SELECT id, tenant_id, principal_id, buyer_ref, status, flight, budget, external_order_id, request, created_at, updated_at
                  FROM buyline_media_buys
                 WHERE ($1::TEXT IS NULL OR tenant_id = $1)
                   AND ($2::TEXT IS NULL OR principal_id = $2)
                   AND ($3::TEXT IS NULL OR status = $3)
                 ORDER BY updated_at DESC
                 OFFSET $4
                "#,
            )
            .bind(tenant)
            .bind(principal)
            .bind(status)
            .bind(to_i64(window.offset)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
        } else {
            sqlx::query(
                r#"
                SELECT id, tenant_id, principal_id, buyer_ref, status, flight, budget, external_order_id, request, created_at, updated_at
                  FROM buyline_media_buys
                 WHERE ($1::TEXT IS NULL OR tenant_id = $1)
                   AND ($2::TEXT IS NULL OR principal_id = $2)
                   AND ($3::TEXT IS NULL OR status = $3)
                 ORDER BY updated_at DESC
                 LIMIT $4 OFFSET $5
                "#,
            )
            .bind(tenant)
            .bind(principal)
            .bind(status)
            .bind(to_i64(window.limit)?)
            .bind(to_i64(window.offset)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
        };

        rows.into_iter().map(media_buy_row_to_record).collect()
    }

    async fn transition_media_buy(
        &self,
        id: &MediaBuyId,
        expected_from: MediaBuyStatus,
        to: MediaBuyStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE buyline_media_buys
               SET status = $1,
                   updated_at = $2
             WHERE id = $3
               AND status = $4
            "#,
        )
        .bind(to.as_str())
        .bind(updated_at)
        .bind(*id.as_uuid())
        .bind(expected_from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            let found = self.get_media_buy(id).await?;
            if let Some(buy) = found {
                return Err(StorageError::InvariantViolation(format!(
                    "invalid status transition: expected {}, found {}",
                    expected_from, buy.status
                )));
            }
            return Err(StorageError::NotFound(format!(
                "media buy {} not found",
                id
            )));
        }

        Ok(())
    }

    async fn set_media_buy_status(
        &self,
        id: &MediaBuyId,
        to: MediaBuyStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE buyline_media_buys
               SET status = $1,
                   updated_at = $2
             WHERE id = $3
            "#,
        )
        .bind(to.as_str())
        .bind(updated_at)
        .bind(*id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "media buy {} not found",
                id
            )));
        }

        Ok(())
    }

    async fn set_external_order_id(
        &self,
        id: &MediaBuyId,
        external_order_id: &str,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE buyline_media_buys
               SET external_order_id = $1,
                   updated_at = $2
             WHERE id = $3
            "#,
        )
        .bind(external_order_id)
        .bind(updated_at)
        .bind(*id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "media buy {} not found",
                id
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl CreativeStore for PostgresBuylineStorage {
    async fn upsert_creative(&self, creative: Creative) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO buyline_creatives
                (id, tenant_id, principal_id, name, format, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
                SET tenant_id = EXCLUDED.tenant_id,
                    principal_id = EXCLUDED.principal_id,
                    name = EXCLUDED.name,
                    format = EXCLUDED.format,
                    status = EXCLUDED.status,
                    created_at = EXCLUDED.created_at,
                    updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(*creative.id.as_uuid())
        .bind(creative.tenant_id.as_str())
        .bind(creative.principal_id.as_str())
        .bind(&creative.name)
        .bind(&creative.format)
        .bind(creative.status.as_str())
        .bind(creative.created_at)
        .bind(creative.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get_creative(&self, id: &CreativeId) -> StorageResult<Option<Creative>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, principal_id, name, format, status, created_at, updated_at
              FROM buyline_creatives
             WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.map(creative_row_to_record).transpose()
    }

    async fn set_creative_status(
        &self,
        id: &CreativeId,
        status: CreativeStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE buyline_creatives
               SET status = $1,
                   updated_at = $2
             WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(updated_at)
        .bind(*id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "creative {} not found",
                id
            )));
        }

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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        sqlx::query("DELETE FROM buyline_creative_assignments WHERE media_buy_id = $1")
            .bind(*media_buy_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        for assignment in assignments {
            sqlx::query(
                r#"
                INSERT INTO buyline_creative_assignments
                    (media_buy_id, package_id, creative_id, created_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(*assignment.media_buy_id.as_uuid())
            .bind(&assignment.package_id)
            .bind(*assignment.creative_id.as_uuid())
            .bind(assignment.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_conflict)?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_assignments(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> StorageResult<Vec<CreativeAssignment>> {
        let rows = sqlx::query(
            r#"
            SELECT media_buy_id, package_id, creative_id, created_at
              FROM buyline_creative_assignments
             WHERE media_buy_id = $1
             ORDER BY created_at ASC, package_id ASC
            "#,
        )
        .bind(*media_buy_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(assignment_row_to_record).collect()
    }

    async fn list_creatives_for_buy(
        &self,
        media_buy_id: &MediaBuyId,
    ) -> StorageResult<Vec<Creative>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT ON (c.id)
                   c.id, c.tenant_id, c.principal_id, c.name, c.format, c.status, c.created_at, c.updated_at
              FROM buyline_creatives c
              JOIN buyline_creative_assignments a ON a.creative_id = c.id
             WHERE a.media_buy_id = $1
             ORDER BY c.id, a.created_at ASC
            "#,
        )
        .bind(*media_buy_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(creative_row_to_record).collect()
    }
}

#[async_trait]
impl WorkflowStore for PostgresBuylineStorage {
    async fn create_step(
        &self,
        step: WorkflowStep,
        mapping: ObjectWorkflowMapping,
    ) -> StorageResult<()> {
        let request_json = serde_json::to_value(&step.request)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let comments_json = serde_json::to_value(&step.comments)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO buyline_workflow_steps
                (id, tenant_id, principal_id, step_type, status, owner, assignee, instructions, request, comments, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(*step.id.as_uuid())
        .bind(step.tenant_id.as_str())
        .bind(step.principal_id.as_str())
        .bind(step.step_type.as_str())
        .bind(step.status.as_str())
        .bind(&step.owner)
        .bind(&step.assignee)
        .bind(&step.instructions)
        .bind(request_json)
        .bind(comments_json)
        .bind(version_to_i64(step.version)?)
        .bind(step.created_at)
        .bind(step.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_conflict)?;

        sqlx::query(
            r#"
            INSERT INTO buyline_object_workflow_mappings
                (object_type, object_id, step_id, action, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(mapping.object_type.as_str())
        .bind(&mapping.object_id)
        .bind(*mapping.step_id.as_uuid())
        .bind(mapping.action.as_str())
        .bind(mapping.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_conflict)?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn get_step(&self, id: &WorkflowStepId) -> StorageResult<Option<WorkflowStep>> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, principal_id, step_type, status, owner, assignee, instructions, request, comments, version, created_at, updated_at
              FROM buyline_workflow_steps
             WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.map(step_row_to_record).transpose()
    }

    async fn list_steps(
        &self,
        filter: StepFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<WorkflowStep>> {
        let tenant = filter.tenant_id.as_ref().map(|t| t.as_str().to_string());
        let status = filter.status.map(|s| s.as_str().to_string());
        let owner = filter.owner.clone();

        let rows = if window.limit == 0 {
            sqlx::query(
                r#"
                SELECT id, tenant_id, principal_id, step_type, status, owner, assignee, instructions, request, comments, version, created_at, updated_at
                  FROM buyline_workflow_steps
                 WHERE ($1::TEXT IS NULL OR tenant_id = $1)
                   AND ($2::TEXT IS NULL OR status = $2)
                   AND ($3::TEXT IS NULL OR owner = $3)
                 ORDER BY updated_at DESC
                 OFFSET $4
                "#,
            )
            .bind(tenant)
            .bind(status)
            .bind(owner)
            .bind(to_i64(window.offset)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
        } else {
            sqlx::query(
                r#"
                SELECT id, tenant_id, principal_id, step_type, status, owner, assignee, instructions, request, comments, version, created_at, updated_at
                  FROM buyline_workflow_steps
                 WHERE ($1::TEXT IS NULL OR tenant_id = $1)
                   AND ($2::TEXT IS NULL OR status = $2)
                   AND ($3::TEXT IS NULL OR owner = $3)
                 ORDER BY updated_at DESC
                 LIMIT $4 OFFSET $5
                "#,
            )
            .bind(tenant)
            .bind(status)
            .bind(owner)
            .bind(to_i64(window.limit)?)
            .bind(to_i64(window.offset)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
        };

        rows.into_iter().map(step_row_to_record).collect()
    }

    async fn decide_step(
        &self,
        id: &WorkflowStepId,
        expected_version: u64,
        new_status: WorkflowStepStatus,
        comment: StepComment,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<WorkflowStep> {
        let comment_json = serde_json::to_value([comment])
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let row = sqlx::query(
            r#"
            UPDATE buyline_workflow_steps
               SET status = $1,
                   comments = comments || $2,
                   version = version + 1,
                   updated_at = $3
             WHERE id = $4
               AND version = $5
               AND status = $6
            RETURNING id, tenant_id, principal_id, step_type, status, owner, assignee, instructions, request, comments, version, created_at, updated_at
            "#,
        )
        .bind(new_status.as_str())
        .bind(comment_json)
        .bind(updated_at)
        .bind(*id.as_uuid())
        .bind(version_to_i64(expected_version)?)
        .bind(WorkflowStepStatus::RequiresApproval.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;

        if let Some(row) = row {
            return step_row_to_record(row);
        }

        // The guarded write matched nothing. Re-read to tell the caller
        // which precondition failed.
        match self.get_step(id).await? {
            None => Err(StorageError::NotFound(format!(
                "workflow step {} not found",
                id
            ))),
            Some(step) if step.version != expected_version => Err(StorageError::Conflict(format!(
                "workflow step {} version conflict: expected {}, found {}",
                id, expected_version, step.version
            ))),
            Some(step) if !step.status.awaits_decision() => {
                Err(StorageError::InvariantViolation(format!(
                    "workflow step {} is not awaiting a decision (status {})",
                    id, step.status
                )))
            }
            // Another writer landed between the UPDATE and the re-read.
            Some(_) => Err(StorageError::Conflict(format!(
                "workflow step {} changed concurrently",
                id
            ))),
        }
    }

    async fn steps_for_object(
        &self,
        object_type: ObjectType,
        object_id: &str,
    ) -> StorageResult<Vec<WorkflowStep>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.tenant_id, s.principal_id, s.step_type, s.status, s.owner, s.assignee, s.instructions, s.request, s.comments, s.version, s.created_at, s.updated_at
              FROM buyline_workflow_steps s
              JOIN buyline_object_workflow_mappings m ON m.step_id = s.id
             WHERE m.object_type = $1
               AND m.object_id = $2
             ORDER BY s.created_at DESC
            "#,
        )
        .bind(object_type.as_str())
        .bind(object_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(step_row_to_record).collect()
    }
}

fn media_buy_row_to_record(row: sqlx::postgres::PgRow) -> StorageResult<MediaBuy> {
    let flight_json: serde_json::Value = row
        .try_get("flight")
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    let request_json: serde_json::Value = row
        .try_get("request")
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    let flight: FlightWindow = serde_json::from_value(flight_json)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    let request: MediaBuyRequest = serde_json::from_value(request_json)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    let status_raw: String = row
        .try_get("status")
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    Ok(MediaBuy {
        id: MediaBuyId::from_uuid(
            row.try_get::<Uuid, _>("id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        tenant_id: TenantId::new(
            row.try_get::<String, _>("tenant_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        principal_id: PrincipalId::new(
            row.try_get::<String, _>("principal_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        buyer_ref: row
            .try_get("buyer_ref")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        status: parse_media_buy_status(&status_raw)?,
        flight,
        budget: row
            .try_get("budget")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        external_order_id: row
            .try_get("external_order_id")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        request,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
    })
}

fn creative_row_to_record(row: sqlx::postgres::PgRow) -> StorageResult<Creative> {
    let status_raw: String = row
        .try_get("status")
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    Ok(Creative {
        id: CreativeId::from_uuid(
            row.try_get::<Uuid, _>("id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        tenant_id: TenantId::new(
            row.try_get::<String, _>("tenant_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        principal_id: PrincipalId::new(
            row.try_get::<String, _>("principal_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        name: row
            .try_get("name")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        format: row
            .try_get("format")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        status: parse_creative_status(&status_raw)?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
    })
}

fn assignment_row_to_record(row: sqlx::postgres::PgRow) -> StorageResult<CreativeAssignment> {
    Ok(CreativeAssignment {
        media_buy_id: MediaBuyId::from_uuid(
            row.try_get::<Uuid, _>("media_buy_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        package_id: row
            .try_get("package_id")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        creative_id: CreativeId::from_uuid(
            row.try_get::<Uuid, _>("creative_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        created_at: row
            .try_get("created_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
    })
}

fn step_row_to_record(row: sqlx::postgres::PgRow) -> StorageResult<WorkflowStep> {
    let request_json: serde_json::Value = row
        .try_get("request")
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    let comments_json: serde_json::Value = row
        .try_get("comments")
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    let request: StepRequestPayload = serde_json::from_value(request_json)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    let comments: Vec<StepComment> = serde_json::from_value(comments_json)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

    let step_type_raw: String = row
        .try_get("step_type")
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    let status_raw: String = row
        .try_get("status")
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    Ok(WorkflowStep {
        id: WorkflowStepId::from_uuid(
            row.try_get::<Uuid, _>("id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        tenant_id: TenantId::new(
            row.try_get::<String, _>("tenant_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        principal_id: PrincipalId::new(
            row.try_get::<String, _>("principal_id")
                .map_err(|e| StorageError::Backend(e.to_string()))?,
        ),
        step_type: parse_step_type(&step_type_raw)?,
        status: parse_step_status(&status_raw)?,
        owner: row
            .try_get("owner")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        assignee: row
            .try_get("assignee")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        instructions: row
            .try_get("instructions")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        request,
        comments,
        version: row
            .try_get::<i64, _>("version")
            .map_err(|e| StorageError::Backend(e.to_string()))? as u64,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
    })
}

fn parse_media_buy_status(raw: &str) -> StorageResult<MediaBuyStatus> {
    MediaBuyStatus::parse_str(raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown media buy status `{raw}`")))
}

fn parse_creative_status(raw: &str) -> StorageResult<CreativeStatus> {
    CreativeStatus::parse_str(raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown creative status `{raw}`")))
}

fn parse_step_type(raw: &str) -> StorageResult<StepType> {
    StepType::parse_str(raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown step type `{raw}`")))
}

fn parse_step_status(raw: &str) -> StorageResult<WorkflowStepStatus> {
    WorkflowStepStatus::parse_str(raw)
        .ok_or_else(|| StorageError::Serialization(format!("unknown step status `{raw}`")))
}

// 23505 unique_violation, 40001 serialization_failure, 40P01 deadlock_detected.
// All three surface as retryable conflicts.
fn map_sqlx_conflict(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.code().as_deref(), Some("23505" | "40001" | "40P01")) {
            return StorageError::Conflict(db_err.message().to_string());
        }
    }
    StorageError::Backend(err.to_string())
}

fn to_i64(value: usize) -> StorageResult<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::InvalidInput("window value too large".to_string()))
}

fn version_to_i64(value: u64) -> StorageResult<i64> {
    i64::try_from(value).map_err(|_| StorageError::InvalidInput("version too large".to_string()))
}
