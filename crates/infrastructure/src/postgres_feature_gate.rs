//! PostgreSQL-backed feature gate keyed by root namespace.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use scanledger_application::FeatureGate;
use scanledger_core::{AppError, AppResult, NamespaceId};

/// Feature gate reading per-namespace enablement rows.
///
/// Namespaces without a row default to disabled.
#[derive(Clone)]
pub struct PostgresFeatureGate {
    pool: PgPool,
}

impl PostgresFeatureGate {
    /// Creates a gate with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EnabledRow {
    enabled: bool,
}

#[derive(Debug, FromRow)]
struct NamespaceIdRow {
    namespace_id: i64,
}

#[async_trait]
impl FeatureGate for PostgresFeatureGate {
    async fn enabled_for_namespace(&self, namespace_id: NamespaceId) -> AppResult<bool> {
        let row = sqlx::query_as::<_, EnabledRow>(
            r#"
            SELECT enabled
            FROM namespace_feature_gates
            WHERE namespace_id = $1
            "#,
        )
        .bind(namespace_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to read feature gate for namespace '{namespace_id}': {error}"
            ))
        })?;

        Ok(row.map(|row| row.enabled).unwrap_or(false))
    }

    async fn enabled_namespaces(
        &self,
        namespace_ids: &[NamespaceId],
    ) -> AppResult<HashSet<NamespaceId>> {
        if namespace_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids = namespace_ids
            .iter()
            .map(NamespaceId::as_i64)
            .collect::<Vec<_>>();
        let rows = sqlx::query_as::<_, NamespaceIdRow>(
            r#"
            SELECT namespace_id
            FROM namespace_feature_gates
            WHERE namespace_id = ANY($1::bigint[])
              AND enabled
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to read feature gate batch: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| NamespaceId::new(row.namespace_id))
            .collect())
    }
}
