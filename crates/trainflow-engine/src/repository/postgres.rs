//! PostgreSQL repositories
//!
//! Queries are built at runtime with `sqlx::query` and bound parameters. A
//! version's subtree is read inside one repeatable-read transaction so the
//! steps, components and options always come from the same snapshot.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{PgConnection, Postgres, Row, Transaction};
use std::collections::HashMap;
use trainflow_common::{RankKey, VersionNumber, VersionedEntityId};
use uuid::Uuid;

use super::{
    ActivationRequest, FlowAssignmentRepository, FlowVersionRepository, RepositoryError,
    RepositoryResult, SnapshotRepository,
};
use crate::models::{
    AssignmentStatus, ComponentDetail, ComponentVersion, FlowAssignment, FlowSnapshot,
    FlowStepVersion, FlowVersion, FlowVersionSummary, QuizOptionVersion, SnapshotRef,
};

const FLOW_COLUMNS: &str = "id, original_id, version, is_active, title, description, tags, \
     priority, is_required, status, created_by_id, created_at, updated_at, activated_at, \
     activated_by_id, row_version";

const ASSIGNMENT_COLUMNS: &str = "id, user_id, original_flow_id, snapshot, status, \
     assigned_by_id, assigned_at, due_at, started_at, completed_at, updated_at";

fn conflict_on_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(what());
        }
    }
    RepositoryError::Database(err)
}

fn version_param(version: VersionNumber) -> RepositoryResult<i32> {
    i32::try_from(version.get())
        .map_err(|_| RepositoryError::Corrupt(format!("{version} exceeds the storable range")))
}

fn rank_from_row(row: &PgRow) -> RepositoryResult<RankKey> {
    let rank: String = row.try_get("rank")?;
    Ok(RankKey::parse(&rank)?)
}

fn flow_from_row(row: &PgRow) -> RepositoryResult<FlowVersion> {
    let version: i32 = row.try_get("version")?;
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    Ok(FlowVersion {
        id: row.try_get("id")?,
        original_id: row.try_get("original_id")?,
        version: VersionNumber::try_from(version)?,
        is_active: row.try_get("is_active")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        tags: row.try_get("tags")?,
        priority: priority.parse().map_err(RepositoryError::Corrupt)?,
        is_required: row.try_get("is_required")?,
        status: status.parse().map_err(RepositoryError::Corrupt)?,
        created_by_id: row.try_get("created_by_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        activated_at: row.try_get("activated_at")?,
        activated_by_id: row.try_get("activated_by_id")?,
        row_version: row.try_get("row_version")?,
        steps: Vec::new(),
    })
}

fn step_from_row(row: &PgRow) -> RepositoryResult<FlowStepVersion> {
    Ok(FlowStepVersion {
        id: row.try_get("id")?,
        original_id: row.try_get("original_id")?,
        flow_version_id: row.try_get("flow_version_id")?,
        order: rank_from_row(row)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        components: Vec::new(),
    })
}

fn component_from_row(row: &PgRow) -> RepositoryResult<ComponentVersion> {
    let detail: serde_json::Value = row.try_get("detail")?;
    Ok(ComponentVersion {
        id: row.try_get("id")?,
        original_id: row.try_get("original_id")?,
        step_version_id: row.try_get("step_version_id")?,
        order: rank_from_row(row)?,
        is_required: row.try_get("is_required")?,
        detail: serde_json::from_value(detail)?,
    })
}

fn option_from_row(row: &PgRow) -> RepositoryResult<QuizOptionVersion> {
    Ok(QuizOptionVersion {
        id: row.try_get("id")?,
        component_version_id: row.try_get("component_version_id")?,
        order: rank_from_row(row)?,
        text: row.try_get("text")?,
        is_correct: row.try_get("is_correct")?,
        points: row.try_get("points")?,
    })
}

fn summary_from_row(row: &PgRow) -> RepositoryResult<FlowVersionSummary> {
    let version: i32 = row.try_get("version")?;
    let status: String = row.try_get("status")?;
    let step_count: i64 = row.try_get("step_count")?;
    Ok(FlowVersionSummary {
        id: row.try_get("id")?,
        original_id: row.try_get("original_id")?,
        version: VersionNumber::try_from(version)?,
        is_active: row.try_get("is_active")?,
        status: status.parse().map_err(RepositoryError::Corrupt)?,
        title: row.try_get("title")?,
        step_count: usize::try_from(step_count).unwrap_or_default(),
        created_by_id: row.try_get("created_by_id")?,
        created_at: row.try_get("created_at")?,
        activated_at: row.try_get("activated_at")?,
    })
}

fn snapshot_from_row(row: &PgRow) -> RepositoryResult<FlowSnapshot> {
    let content: serde_json::Value = row.try_get("content")?;
    Ok(FlowSnapshot {
        id: row.try_get("id")?,
        flow_version_id: row.try_get("flow_version_id")?,
        content: serde_json::from_value(content)?,
        taken_at: row.try_get("taken_at")?,
    })
}

fn assignment_from_row(row: &PgRow) -> RepositoryResult<FlowAssignment> {
    let snapshot: serde_json::Value = row.try_get("snapshot")?;
    let status: String = row.try_get("status")?;
    Ok(FlowAssignment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        original_flow_id: row.try_get("original_flow_id")?,
        snapshot: serde_json::from_value::<SnapshotRef>(snapshot)?,
        status: status.parse().map_err(RepositoryError::Corrupt)?,
        assigned_by_id: row.try_get("assigned_by_id")?,
        assigned_at: row.try_get("assigned_at")?,
        due_at: row.try_get("due_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Load steps, components and quiz options of `flow` from `conn`.
async fn load_tree(conn: &mut PgConnection, flow: &mut FlowVersion) -> RepositoryResult<()> {
    let step_rows = sqlx::query(
        "SELECT id, original_id, flow_version_id, rank, title, description \
         FROM flow_step_versions WHERE flow_version_id = $1",
    )
    .bind(flow.id)
    .fetch_all(&mut *conn)
    .await?;
    let mut steps = step_rows
        .iter()
        .map(step_from_row)
        .collect::<RepositoryResult<Vec<_>>>()?;
    let step_ids: Vec<Uuid> = steps.iter().map(|s| s.id).collect();

    let component_rows = sqlx::query(
        "SELECT id, original_id, step_version_id, rank, is_required, detail \
         FROM component_versions WHERE step_version_id = ANY($1)",
    )
    .bind(&step_ids)
    .fetch_all(&mut *conn)
    .await?;
    let mut components = component_rows
        .iter()
        .map(component_from_row)
        .collect::<RepositoryResult<Vec<_>>>()?;
    let quiz_ids: Vec<Uuid> = components
        .iter()
        .filter(|c| matches!(c.detail, ComponentDetail::Quiz(_)))
        .map(|c| c.id)
        .collect();

    let mut options_by_component: HashMap<Uuid, Vec<QuizOptionVersion>> = HashMap::new();
    if !quiz_ids.is_empty() {
        let option_rows = sqlx::query(
            "SELECT id, component_version_id, rank, text, is_correct, points \
             FROM quiz_option_versions WHERE component_version_id = ANY($1)",
        )
        .bind(&quiz_ids)
        .fetch_all(&mut *conn)
        .await?;
        for row in &option_rows {
            let option = option_from_row(row)?;
            options_by_component
                .entry(option.component_version_id)
                .or_default()
                .push(option);
        }
    }

    for component in &mut components {
        if let ComponentDetail::Quiz(quiz) = &mut component.detail {
            quiz.options = options_by_component.remove(&component.id).unwrap_or_default();
        }
    }

    let mut components_by_step: HashMap<Uuid, Vec<ComponentVersion>> = HashMap::new();
    for component in components {
        components_by_step
            .entry(component.step_version_id)
            .or_default()
            .push(component);
    }
    for step in &mut steps {
        step.components = components_by_step.remove(&step.id).unwrap_or_default();
    }

    flow.steps = steps;
    flow.normalize_order();
    Ok(())
}

/// Insert the whole subtree of `flow`. Existing rows must already be gone.
async fn insert_tree(conn: &mut PgConnection, flow: &FlowVersion) -> RepositoryResult<()> {
    for step in &flow.steps {
        sqlx::query(
            "INSERT INTO flow_step_versions (id, original_id, flow_version_id, rank, title, description) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(step.id)
        .bind(step.original_id)
        .bind(flow.id)
        .bind(step.order.as_str())
        .bind(&step.title)
        .bind(&step.description)
        .execute(&mut *conn)
        .await?;

        for component in &step.components {
            // Options live in their own table; the JSON payload carries the rest.
            let mut detail = component.detail.clone();
            if let ComponentDetail::Quiz(quiz) = &mut detail {
                quiz.options.clear();
            }
            sqlx::query(
                "INSERT INTO component_versions \
                 (id, original_id, step_version_id, rank, component_type, is_required, detail) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(component.id)
            .bind(component.original_id)
            .bind(step.id)
            .bind(component.order.as_str())
            .bind(component.component_type().as_str())
            .bind(component.is_required)
            .bind(serde_json::to_value(&detail)?)
            .execute(&mut *conn)
            .await?;

            if let ComponentDetail::Quiz(quiz) = &component.detail {
                for option in &quiz.options {
                    sqlx::query(
                        "INSERT INTO quiz_option_versions \
                         (id, component_version_id, rank, text, is_correct, points) \
                         VALUES ($1, $2, $3, $4, $5, $6)",
                    )
                    .bind(option.id)
                    .bind(component.id)
                    .bind(option.order.as_str())
                    .bind(&option.text)
                    .bind(option.is_correct)
                    .bind(option.points)
                    .execute(&mut *conn)
                    .await?;
                }
            }
        }
    }
    Ok(())
}

pub struct PgFlowVersionRepository {
    pool: PgPool,
}

impl PgFlowVersionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin_read(&self) -> RepositoryResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

/// Complete a read started with `begin_read` by loading the subtree of `row`.
async fn finish_with_tree(
    mut tx: Transaction<'static, Postgres>,
    row: Option<PgRow>,
) -> RepositoryResult<Option<FlowVersion>> {
    let flow = match row {
        Some(row) => {
            let mut flow = flow_from_row(&row)?;
            load_tree(&mut *tx, &mut flow).await?;
            Some(flow)
        },
        None => None,
    };
    tx.commit().await?;
    Ok(flow)
}

#[async_trait]
impl FlowVersionRepository for PgFlowVersionRepository {
    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<FlowVersion>> {
        let mut tx = self.begin_read().await?;
        let sql = format!("SELECT {FLOW_COLUMNS} FROM flow_versions WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *tx).await?;
        finish_with_tree(tx, row).await
    }

    async fn get_by_version(
        &self,
        version: VersionedEntityId<FlowVersion>,
    ) -> RepositoryResult<Option<FlowVersion>> {
        let mut tx = self.begin_read().await?;
        let sql = format!(
            "SELECT {FLOW_COLUMNS} FROM flow_versions WHERE original_id = $1 AND version = $2"
        );
        let row = sqlx::query(&sql)
            .bind(version.original_id)
            .bind(version_param(version.version)?)
            .fetch_optional(&mut *tx)
            .await?;
        finish_with_tree(tx, row).await
    }

    async fn get_active(&self, original_id: Uuid) -> RepositoryResult<Option<FlowVersion>> {
        let mut tx = self.begin_read().await?;
        let sql =
            format!("SELECT {FLOW_COLUMNS} FROM flow_versions WHERE original_id = $1 AND is_active");
        let row = sqlx::query(&sql)
            .bind(original_id)
            .fetch_optional(&mut *tx)
            .await?;
        finish_with_tree(tx, row).await
    }

    async fn list_versions(&self, original_id: Uuid) -> RepositoryResult<Vec<FlowVersionSummary>> {
        let rows = sqlx::query(
            "SELECT f.id, f.original_id, f.version, f.is_active, f.status, f.title, \
                    f.created_by_id, f.created_at, f.activated_at, \
                    (SELECT COUNT(*) FROM flow_step_versions s WHERE s.flow_version_id = f.id) AS step_count \
             FROM flow_versions f WHERE f.original_id = $1 ORDER BY f.version",
        )
        .bind(original_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    async fn get_max_version(&self, original_id: Uuid) -> RepositoryResult<Option<VersionNumber>> {
        let max: Option<i32> =
            sqlx::query_scalar("SELECT MAX(version) FROM flow_versions WHERE original_id = $1")
                .bind(original_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(max.map(VersionNumber::try_from).transpose()?)
    }

    async fn add(&self, flow: &FlowVersion) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO flow_versions \
             (id, original_id, version, is_active, title, description, tags, priority, is_required, \
              status, created_by_id, created_at, updated_at, activated_at, activated_by_id, row_version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(flow.id)
        .bind(flow.original_id)
        .bind(version_param(flow.version)?)
        .bind(flow.is_active)
        .bind(&flow.title)
        .bind(&flow.description)
        .bind(&flow.tags)
        .bind(flow.priority.as_str())
        .bind(flow.is_required)
        .bind(flow.status.as_str())
        .bind(flow.created_by_id)
        .bind(flow.created_at)
        .bind(flow.updated_at)
        .bind(flow.activated_at)
        .bind(flow.activated_by_id)
        .bind(flow.row_version)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("{} already exists", flow.versioned_id())))?;

        insert_tree(&mut *tx, flow).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, flow: &FlowVersion) -> RepositoryResult<i64> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE flow_versions \
             SET title = $2, description = $3, tags = $4, priority = $5, is_required = $6, \
                 updated_at = $7, row_version = row_version + 1 \
             WHERE id = $1 AND row_version = $8 AND NOT is_active AND status = 'draft' \
             RETURNING row_version",
        )
        .bind(flow.id)
        .bind(&flow.title)
        .bind(&flow.description)
        .bind(&flow.tags)
        .bind(flow.priority.as_str())
        .bind(flow.is_required)
        .bind(flow.updated_at)
        .bind(flow.row_version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = updated else {
            let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM flow_versions WHERE id = $1")
                .bind(flow.id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => RepositoryError::Conflict(format!(
                    "flow version {} changed or is no longer a draft",
                    flow.id
                )),
                None => RepositoryError::NotFound {
                    entity: "Flow version",
                    id: flow.id,
                },
            });
        };
        let row_version: i64 = row.try_get("row_version")?;

        sqlx::query("DELETE FROM flow_step_versions WHERE flow_version_id = $1")
            .bind(flow.id)
            .execute(&mut *tx)
            .await?;
        insert_tree(&mut *tx, flow).await?;
        tx.commit().await?;
        Ok(row_version)
    }

    async fn activate(&self, request: &ActivationRequest) -> RepositoryResult<()> {
        let mut tx = self.pool.begin().await?;

        // Lock every version of the flow; a concurrent activation waits here
        // and then observes the new active row.
        let rows = sqlx::query(
            "SELECT id, is_active FROM flow_versions WHERE original_id = $1 ORDER BY version FOR UPDATE",
        )
        .bind(request.original_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut current_active = None;
        let mut target_found = false;
        for row in &rows {
            let id: Uuid = row.try_get("id")?;
            if row.try_get::<bool, _>("is_active")? {
                current_active = Some(id);
            }
            target_found |= id == request.target_id;
        }
        if current_active == Some(request.target_id) {
            return Err(RepositoryError::AlreadyActive {
                id: request.target_id,
            });
        }
        if current_active != request.expected_active_id {
            return Err(RepositoryError::Conflict(format!(
                "active version of flow {} changed concurrently",
                request.original_id
            )));
        }
        if !target_found {
            return Err(RepositoryError::NotFound {
                entity: "Flow version",
                id: request.target_id,
            });
        }

        sqlx::query(
            "UPDATE flow_versions \
             SET is_active = FALSE, status = 'archived', updated_at = $2, row_version = row_version + 1 \
             WHERE original_id = $1 AND is_active",
        )
        .bind(request.original_id)
        .bind(request.activated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE flow_versions \
             SET is_active = TRUE, status = 'published', activated_at = $2, activated_by_id = $3, \
                 updated_at = $2, row_version = row_version + 1 \
             WHERE id = $1",
        )
        .bind(request.target_id)
        .bind(request.activated_at)
        .bind(request.activated_by_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_unique(e, || {
                format!("flow {} already has an active version", request.original_id)
            })
        })?;

        tx.commit().await?;
        Ok(())
    }
}

pub struct PgAssignmentRepository {
    pool: PgPool,
}

impl PgAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlowAssignmentRepository for PgAssignmentRepository {
    async fn add(&self, assignment: &FlowAssignment) -> RepositoryResult<()> {
        sqlx::query(
            "INSERT INTO flow_assignments \
             (id, user_id, original_flow_id, flow_version_id, snapshot, status, assigned_by_id, \
              assigned_at, due_at, started_at, completed_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(assignment.id)
        .bind(assignment.user_id)
        .bind(assignment.original_flow_id)
        .bind(assignment.snapshot.flow_version_id())
        .bind(serde_json::to_value(&assignment.snapshot)?)
        .bind(assignment.status.as_str())
        .bind(assignment.assigned_by_id)
        .bind(assignment.assigned_at)
        .bind(assignment.due_at)
        .bind(assignment.started_at)
        .bind(assignment.completed_at)
        .bind(assignment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("assignment {} already exists", assignment.id)))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> RepositoryResult<Option<FlowAssignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM flow_assignments WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn get_by_flow_id(&self, original_flow_id: Uuid) -> RepositoryResult<Vec<FlowAssignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM flow_assignments \
             WHERE original_flow_id = $1 ORDER BY assigned_at, id"
        );
        let rows = sqlx::query(&sql)
            .bind(original_flow_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(assignment_from_row).collect()
    }

    async fn count_bound_to(&self, flow_version_id: Uuid) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM flow_assignments \
             WHERE flow_version_id = $1 AND status IN ('assigned', 'in_progress')",
        )
        .bind(flow_version_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn update_status(
        &self,
        assignment: &FlowAssignment,
        expected: AssignmentStatus,
    ) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE flow_assignments \
             SET status = $2, started_at = $3, completed_at = $4, updated_at = $5 \
             WHERE id = $1 AND status = $6",
        )
        .bind(assignment.id)
        .bind(assignment.status.as_str())
        .bind(assignment.started_at)
        .bind(assignment.completed_at)
        .bind(assignment.updated_at)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get_by_id(assignment.id).await? {
                Some(current) => RepositoryError::Conflict(format!(
                    "assignment {} is now {}",
                    assignment.id, current.status
                )),
                None => RepositoryError::NotFound {
                    entity: "Assignment",
                    id: assignment.id,
                },
            });
        }
        Ok(())
    }
}

pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    async fn save(&self, snapshot: &FlowSnapshot) -> RepositoryResult<()> {
        sqlx::query(
            "INSERT INTO flow_snapshots (id, flow_version_id, content, taken_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(snapshot.id)
        .bind(snapshot.flow_version_id)
        .bind(serde_json::to_value(&snapshot.content)?)
        .bind(snapshot.taken_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, || format!("snapshot {} already exists", snapshot.id)))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> RepositoryResult<Option<FlowSnapshot>> {
        let row = sqlx::query(
            "SELECT id, flow_version_id, content, taken_at FROM flow_snapshots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(snapshot_from_row).transpose()
    }
}
