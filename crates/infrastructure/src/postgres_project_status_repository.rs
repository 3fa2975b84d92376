//! PostgreSQL-backed repository for project-level analyzer statuses.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};

use scanledger_application::{NewProjectStatus, ProjectStatusRepository};
use scanledger_core::{AppError, AppResult, ProjectId, TraversalIds};
use scanledger_domain::{AnalyzerProjectStatus, AnalyzerStatus, AnalyzerType};

/// PostgreSQL implementation of the project-status repository port.
#[derive(Clone)]
pub struct PostgresProjectStatusRepository {
    pool: PgPool,
}

impl PostgresProjectStatusRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProjectStatusRow {
    project_id: i64,
    analyzer_type: String,
    status: String,
    traversal_ids: Vec<i64>,
    archived: bool,
    last_call: DateTime<Utc>,
}

fn status_from_row(row: ProjectStatusRow) -> AppResult<AnalyzerProjectStatus> {
    let analyzer_type = AnalyzerType::from_str(row.analyzer_type.as_str()).map_err(|error| {
        AppError::Internal(format!(
            "persisted analyzer status for project '{}' is invalid: {error}",
            row.project_id
        ))
    })?;
    let status = AnalyzerStatus::from_str(row.status.as_str()).map_err(|error| {
        AppError::Internal(format!(
            "persisted analyzer status for project '{}' is invalid: {error}",
            row.project_id
        ))
    })?;
    let traversal_ids = TraversalIds::new(row.traversal_ids).map_err(|error| {
        AppError::Internal(format!(
            "persisted analyzer status for project '{}' is invalid: {error}",
            row.project_id
        ))
    })?;

    Ok(AnalyzerProjectStatus::new(
        ProjectId::new(row.project_id),
        analyzer_type,
        status,
        traversal_ids,
        row.archived,
        row.last_call,
    ))
}

async fn upsert_rows(connection: &mut PgConnection, rows: &[NewProjectStatus]) -> AppResult<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO analyzer_project_statuses \
         (project_id, analyzer_type, status, traversal_ids, archived, last_call, created_at, updated_at) ",
    );

    builder.push_values(rows, |mut values, row| {
        values
            .push_bind(row.project_id.as_i64())
            .push_bind(row.analyzer_type.as_str())
            .push_bind(row.status.as_str())
            .push_bind(row.traversal_ids.to_vec())
            .push_bind(row.archived)
            .push_bind(row.last_call)
            .push("now()")
            .push("now()");
    });

    builder.push(
        " ON CONFLICT (project_id, analyzer_type) DO UPDATE SET \
         status = EXCLUDED.status, \
         traversal_ids = EXCLUDED.traversal_ids, \
         archived = EXCLUDED.archived, \
         last_call = EXCLUDED.last_call, \
         updated_at = now()",
    );

    builder
        .build()
        .execute(connection)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to upsert analyzer project statuses: {error}"))
        })?;

    Ok(())
}

#[async_trait]
impl ProjectStatusRepository for PostgresProjectStatusRepository {
    async fn statuses_for_project(
        &self,
        project_id: ProjectId,
    ) -> AppResult<Vec<AnalyzerProjectStatus>> {
        let rows = sqlx::query_as::<_, ProjectStatusRow>(
            r#"
            SELECT project_id, analyzer_type, status, traversal_ids, archived, last_call
            FROM analyzer_project_statuses
            WHERE project_id = $1
            ORDER BY analyzer_type
            "#,
        )
        .bind(project_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list analyzer statuses for project '{project_id}': {error}"
            ))
        })?;

        rows.into_iter().map(status_from_row).collect()
    }

    async fn statuses_for_projects(
        &self,
        project_ids: &[ProjectId],
        analyzer_types: &[AnalyzerType],
    ) -> AppResult<Vec<AnalyzerProjectStatus>> {
        if project_ids.is_empty() || analyzer_types.is_empty() {
            return Ok(Vec::new());
        }

        let ids = project_ids.iter().map(ProjectId::as_i64).collect::<Vec<_>>();
        let types = analyzer_types
            .iter()
            .map(|analyzer_type| analyzer_type.as_str().to_owned())
            .collect::<Vec<_>>();

        let rows = sqlx::query_as::<_, ProjectStatusRow>(
            r#"
            SELECT project_id, analyzer_type, status, traversal_ids, archived, last_call
            FROM analyzer_project_statuses
            WHERE project_id = ANY($1::bigint[])
              AND analyzer_type = ANY($2::text[])
            ORDER BY project_id, analyzer_type
            "#,
        )
        .bind(ids)
        .bind(types)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list analyzer statuses for project batch: {error}"
            ))
        })?;

        rows.into_iter().map(status_from_row).collect()
    }

    async fn replace_pipeline_statuses(
        &self,
        project_id: ProjectId,
        rows: Vec<NewProjectStatus>,
    ) -> AppResult<()> {
        let processed = rows
            .iter()
            .map(|row| row.analyzer_type.as_str().to_owned())
            .collect::<Vec<_>>();
        let pipeline_scope = AnalyzerType::pipeline_based()
            .iter()
            .map(|analyzer_type| analyzer_type.as_str().to_owned())
            .collect::<Vec<_>>();

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start analyzer status transaction for project '{project_id}': {error}"
            ))
        })?;

        upsert_rows(&mut transaction, &rows).await?;


        // An analyzer that stopped reporting is downgraded, not left stale.
        // Settings-based rows are outside the pipeline scope and untouched.
        sqlx::query(
            r#"
            UPDATE analyzer_project_statuses
            SET status = 'not_configured', updated_at = now()
            WHERE project_id = $1
              AND analyzer_type = ANY($2::text[])
              AND NOT (analyzer_type = ANY($3::text[]))
              AND status <> 'not_configured'
            "#,
        )
        .bind(project_id.as_i64())
        .bind(pipeline_scope)
        .bind(processed)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to downgrade missing analyzer statuses for project '{project_id}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit analyzer status transaction for project '{project_id}': {error}"
            ))
        })?;

        Ok(())
    }

    async fn upsert_statuses(&self, rows: Vec<NewProjectStatus>) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut connection = self.pool.acquire().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to acquire connection for analyzer status upsert: {error}"
            ))
        })?;

        upsert_rows(&mut connection, &rows).await
    }

    async fn set_archived(&self, project_id: ProjectId, archived: bool) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start archived-flag transaction for project '{project_id}': {error}"
            ))
        })?;

        sqlx::query(
            r#"
            UPDATE analyzer_project_statuses
            SET archived = $2, updated_at = now()
            WHERE project_id = $1
            "#,
        )
        .bind(project_id.as_i64())
        .bind(archived)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update archived flag on analyzer statuses for project '{project_id}': {error}"
            ))
        })?;

        sqlx::query(
            r#"
            UPDATE security_inventory_filters
            SET archived = $2
            WHERE project_id = $1
            "#,
        )
        .bind(project_id.as_i64())
        .bind(archived)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update archived flag on inventory filters for project '{project_id}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit archived-flag transaction for project '{project_id}': {error}"
            ))
        })?;

        Ok(())
    }
}
