//! PostgreSQL-backed finder for completed pipeline scan jobs.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use scanledger_application::PipelineRepository;
use scanledger_core::{AppError, AppResult, PipelineId};
use scanledger_domain::{CiJobStatus, ReportType, SecurityJob};

/// PostgreSQL implementation of the pipeline read port.
#[derive(Clone)]
pub struct PostgresPipelineRepository {
    pool: PgPool,
}

impl PostgresPipelineRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SecurityJobRow {
    name: String,
    status: String,
    report_types: Vec<String>,
}

#[async_trait]
impl PipelineRepository for PostgresPipelineRepository {
    async fn completed_security_jobs(
        &self,
        pipeline_id: PipelineId,
    ) -> AppResult<Vec<SecurityJob>> {
        let rows = sqlx::query_as::<_, SecurityJobRow>(
            r#"
            SELECT name, status, report_types
            FROM security_jobs
            WHERE pipeline_id = $1
              AND status IN ('success', 'failed', 'canceled', 'skipped')
            ORDER BY id
            "#,
        )
        .bind(pipeline_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list security jobs for pipeline '{pipeline_id}': {error}"
            ))
        })?;

        rows.into_iter()
            .map(|row| {
                let status = CiJobStatus::from_str(row.status.as_str()).map_err(|error| {
                    AppError::Internal(format!(
                        "persisted security job '{}' is invalid: {error}",
                        row.name
                    ))
                })?;
                let report_types = row
                    .report_types
                    .iter()
                    .map(|report_type| {
                        ReportType::from_str(report_type.as_str()).map_err(|error| {
                            AppError::Internal(format!(
                                "persisted security job '{}' is invalid: {error}",
                                row.name
                            ))
                        })
                    })
                    .collect::<AppResult<Vec<_>>>()?;

                Ok(SecurityJob::new(row.name, status, report_types))
            })
            .collect()
    }
}
