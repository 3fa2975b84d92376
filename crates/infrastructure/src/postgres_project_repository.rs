//! PostgreSQL-backed read adapter for projects and namespaces.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use scanledger_application::{NamespaceRef, ProjectRef, ProjectRepository, ProjectWithSettings};
use scanledger_core::{AppError, AppResult, NamespaceId, ProjectId, TraversalIds};
use scanledger_domain::SecuritySettings;

/// PostgreSQL implementation of the project read port.
#[derive(Clone)]
pub struct PostgresProjectRepository {
    pool: PgPool,
}

impl PostgresProjectRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: i64,
    namespace_id: i64,
    archived: bool,
    traversal_ids: Vec<i64>,
}

#[derive(Debug, FromRow)]
struct ProjectSettingsRow {
    id: i64,
    namespace_id: i64,
    archived: bool,
    traversal_ids: Vec<i64>,
    secret_push_protection_enabled: bool,
    container_scanning_for_registry_enabled: bool,
}

#[derive(Debug, FromRow)]
struct NamespaceRow {
    id: i64,
    traversal_ids: Vec<i64>,
    archived: bool,
}

#[derive(Debug, FromRow)]
struct ArchivedRow {
    archived: bool,
}

fn project_from_row(row: ProjectRow) -> AppResult<ProjectRef> {
    let traversal_ids = TraversalIds::new(row.traversal_ids).map_err(|error| {
        AppError::Internal(format!(
            "persisted namespace path for project '{}' is invalid: {error}",
            row.id
        ))
    })?;

    Ok(ProjectRef {
        id: ProjectId::new(row.id),
        namespace_id: NamespaceId::new(row.namespace_id),
        traversal_ids,
        archived: row.archived,
    })
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<ProjectRef>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT p.id, p.namespace_id, p.archived, n.traversal_ids
            FROM projects p
            JOIN namespaces n ON n.id = p.namespace_id
            WHERE p.id = $1
            "#,
        )
        .bind(project_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load project '{project_id}': {error}"))
        })?;

        row.map(project_from_row).transpose()
    }

    async fn find_namespace(&self, namespace_id: NamespaceId) -> AppResult<Option<NamespaceRef>> {
        let row = sqlx::query_as::<_, NamespaceRow>(
            r#"
            SELECT id, traversal_ids, archived
            FROM namespaces
            WHERE id = $1
            "#,
        )
        .bind(namespace_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load namespace '{namespace_id}': {error}"))
        })?;

        row.map(|row| {
            let traversal_ids = TraversalIds::new(row.traversal_ids).map_err(|error| {
                AppError::Internal(format!(
                    "persisted traversal path for namespace '{}' is invalid: {error}",
                    row.id
                ))
            })?;

            Ok(NamespaceRef {
                id: NamespaceId::new(row.id),
                traversal_ids,
                archived: row.archived,
            })
        })
        .transpose()
    }

    async fn projects_with_settings(
        &self,
        project_ids: &[ProjectId],
    ) -> AppResult<Vec<ProjectWithSettings>> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = project_ids.iter().map(ProjectId::as_i64).collect::<Vec<_>>();
        let rows = sqlx::query_as::<_, ProjectSettingsRow>(
            r#"
            SELECT p.id, p.namespace_id, p.archived, n.traversal_ids,
                   COALESCE(s.secret_push_protection_enabled, FALSE)
                       AS secret_push_protection_enabled,
                   COALESCE(s.container_scanning_for_registry_enabled, FALSE)
                       AS container_scanning_for_registry_enabled
            FROM projects p
            JOIN namespaces n ON n.id = p.namespace_id
            LEFT JOIN project_security_settings s ON s.project_id = p.id
            WHERE p.id = ANY($1::bigint[])
            ORDER BY p.id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load project settings batch: {error}"))
        })?;

        rows.into_iter()
            .map(|row| {
                let settings = SecuritySettings {
                    secret_push_protection_enabled: row.secret_push_protection_enabled,
                    container_scanning_for_registry_enabled: row
                        .container_scanning_for_registry_enabled,
                };
                let project = project_from_row(ProjectRow {
                    id: row.id,
                    namespace_id: row.namespace_id,
                    archived: row.archived,
                    traversal_ids: row.traversal_ids,
                })?;

                Ok(ProjectWithSettings { project, settings })
            })
            .collect()
    }

    async fn effective_archived(&self, project_id: ProjectId) -> AppResult<Option<bool>> {
        let row = sqlx::query_as::<_, ArchivedRow>(
            r#"
            SELECT p.archived
                   OR EXISTS (
                       SELECT 1
                       FROM namespaces ancestor
                       WHERE ancestor.id = ANY(n.traversal_ids)
                         AND ancestor.archived
                   ) AS archived
            FROM projects p
            JOIN namespaces n ON n.id = p.namespace_id
            WHERE p.id = $1
            "#,
        )
        .bind(project_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to compute archived state for project '{project_id}': {error}"
            ))
        })?;

        Ok(row.map(|row| row.archived))
    }
}
