//! PostgreSQL-backed repository for namespace-level analyzer rollups.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use scanledger_application::{NamespaceStatusRepository, TraversalRewritePage};
use scanledger_core::{AppError, AppResult, NamespaceId, TraversalIds};
use scanledger_domain::{AnalyzerCounterDelta, AnalyzerNamespaceStatus, AnalyzerType};

/// Expands one project's counter deltas across every ancestor level and
/// applies them with a single conflict-resolving upsert.
///
/// The diff row is expanded per prefix length of the traversal path, so a
/// project at depth N yields N ancestor-level rows, each addressed by the
/// truncated path and its last element. Fresh rows clamp the delta itself
/// at zero, existing rows clamp after adding; the join deciding which clamp
/// applies is best-effort under concurrent inserts.
const APPLY_DIFFS_SQL: &str = r#"
WITH diffs AS (
    SELECT t.analyzer_type, t.success, t.failure
    FROM UNNEST($2::text[], $3::bigint[], $4::bigint[]) AS t(analyzer_type, success, failure)
),
expanded AS (
    SELECT ($1::bigint[])[level] AS namespace_id,
           ($1::bigint[])[1:level] AS traversal_ids,
           diffs.analyzer_type,
           diffs.success,
           diffs.failure
    FROM diffs
    CROSS JOIN generate_series(1, array_length($1::bigint[], 1)) AS level
),
aggregated AS (
    SELECT namespace_id, traversal_ids, analyzer_type,
           SUM(success)::bigint AS success,
           SUM(failure)::bigint AS failure
    FROM expanded
    GROUP BY namespace_id, traversal_ids, analyzer_type
),
prepared AS (
    SELECT aggregated.namespace_id,
           aggregated.traversal_ids,
           aggregated.analyzer_type,
           CASE WHEN existing.id IS NULL THEN GREATEST(aggregated.success, 0)
                ELSE aggregated.success END AS success,
           CASE WHEN existing.id IS NULL THEN GREATEST(aggregated.failure, 0)
                ELSE aggregated.failure END AS failure
    FROM aggregated
    LEFT JOIN analyzer_namespace_statuses existing
      ON existing.namespace_id = aggregated.namespace_id
     AND existing.analyzer_type = aggregated.analyzer_type
)
INSERT INTO analyzer_namespace_statuses
    (namespace_id, traversal_ids, analyzer_type, success, failure, created_at, updated_at)
SELECT namespace_id, traversal_ids, analyzer_type, success, failure, now(), now()
FROM prepared
ON CONFLICT (namespace_id, analyzer_type) DO UPDATE SET
    success = GREATEST(analyzer_namespace_statuses.success + EXCLUDED.success, 0),
    failure = GREATEST(analyzer_namespace_statuses.failure + EXCLUDED.failure, 0),
    traversal_ids = EXCLUDED.traversal_ids,
    updated_at = now()
"#;

/// Rewrites the old traversal prefix to the new one for one id-keyed batch
/// of rows inside the old prefix's lexicographic array range.
const REWRITE_PREFIX_SQL: &str = r#"
WITH batch AS (
    SELECT id
    FROM analyzer_namespace_statuses
    WHERE traversal_ids >= $1::bigint[]
      AND traversal_ids < $2::bigint[]
      AND id > $3
    ORDER BY id
    LIMIT $4
)
UPDATE analyzer_namespace_statuses
SET traversal_ids = $5::bigint[] || traversal_ids[array_length($1::bigint[], 1) + 1:],
    updated_at = now()
FROM batch
WHERE analyzer_namespace_statuses.id = batch.id
RETURNING analyzer_namespace_statuses.id
"#;

/// PostgreSQL implementation of the namespace-status repository port.
#[derive(Clone)]
pub struct PostgresNamespaceStatusRepository {
    pool: PgPool,
}

impl PostgresNamespaceStatusRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NamespaceStatusRow {
    namespace_id: i64,
    analyzer_type: String,
    traversal_ids: Vec<i64>,
    success: i64,
    failure: i64,
}

#[derive(Debug, FromRow)]
struct RewrittenRow {
    id: i64,
}

fn status_from_row(row: NamespaceStatusRow) -> AppResult<AnalyzerNamespaceStatus> {
    let analyzer_type = AnalyzerType::from_str(row.analyzer_type.as_str()).map_err(|error| {
        AppError::Internal(format!(
            "persisted namespace status for namespace '{}' is invalid: {error}",
            row.namespace_id
        ))
    })?;
    let traversal_ids = TraversalIds::new(row.traversal_ids).map_err(|error| {
        AppError::Internal(format!(
            "persisted namespace status for namespace '{}' is invalid: {error}",
            row.namespace_id
        ))
    })?;

    Ok(AnalyzerNamespaceStatus::new(
        NamespaceId::new(row.namespace_id),
        analyzer_type,
        traversal_ids,
        row.success,
        row.failure,
    ))
}

#[async_trait]
impl NamespaceStatusRepository for PostgresNamespaceStatusRepository {
    async fn apply_counter_deltas(
        &self,
        traversal_ids: &TraversalIds,
        deltas: &[AnalyzerCounterDelta],
    ) -> AppResult<()> {
        if deltas.is_empty() {
            return Ok(());
        }

        let types = deltas
            .iter()
            .map(|delta| delta.analyzer_type.as_str().to_owned())
            .collect::<Vec<_>>();
        let successes = deltas.iter().map(|delta| delta.success).collect::<Vec<_>>();
        let failures = deltas.iter().map(|delta| delta.failure).collect::<Vec<_>>();

        sqlx::query(APPLY_DIFFS_SQL)
            .bind(traversal_ids.to_vec())
            .bind(types)
            .bind(successes)
            .bind(failures)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to apply namespace status diffs for path '{traversal_ids}': {error}"
                ))
            })?;

        Ok(())
    }

    async fn rewrite_traversal_prefix(
        &self,
        old_prefix: &TraversalIds,
        new_prefix: &TraversalIds,
        after_id: i64,
        limit: i64,
    ) -> AppResult<TraversalRewritePage> {
        let rows = sqlx::query_as::<_, RewrittenRow>(REWRITE_PREFIX_SQL)
            .bind(old_prefix.to_vec())
            .bind(old_prefix.upper_bound())
            .bind(after_id)
            .bind(limit)
            .bind(new_prefix.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to rewrite namespace status traversal ids from '{old_prefix}' to '{new_prefix}': {error}"
                ))
            })?;

        Ok(TraversalRewritePage {
            rows_affected: rows.len() as u64,
            last_id: rows.iter().map(|row| row.id).max(),
        })
    }

    async fn statuses_for_namespace(
        &self,
        namespace_id: NamespaceId,
    ) -> AppResult<Vec<AnalyzerNamespaceStatus>> {
        let rows = sqlx::query_as::<_, NamespaceStatusRow>(
            r#"
            SELECT namespace_id, analyzer_type, traversal_ids, success, failure
            FROM analyzer_namespace_statuses
            WHERE namespace_id = $1
            ORDER BY analyzer_type
            "#,
        )
        .bind(namespace_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list namespace statuses for namespace '{namespace_id}': {error}"
            ))
        })?;

        rows.into_iter().map(status_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use scanledger_application::NamespaceStatusRepository;
    use scanledger_core::{NamespaceId, TraversalIds};
    use scanledger_domain::{AnalyzerCounterDelta, AnalyzerType};

    use super::PostgresNamespaceStatusRepository;

    static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

    async fn test_pool() -> Option<PgPool> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return None;
        };

        let pool = match PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };

        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for namespace status tests: {error}");
        }

        Some(pool)
    }

    async fn clear_subtree(pool: &PgPool, root: i64) {
        let deleted =
            sqlx::query("DELETE FROM analyzer_namespace_statuses WHERE traversal_ids[1] = $1")
                .bind(root)
                .execute(pool)
                .await;
        assert!(deleted.is_ok());
    }

    fn path(ids: &[i64]) -> TraversalIds {
        TraversalIds::new(ids.to_vec()).unwrap_or_else(|_| unreachable!())
    }

    async fn counters(
        repository: &PostgresNamespaceStatusRepository,
        namespace_id: i64,
        analyzer_type: AnalyzerType,
    ) -> (i64, i64) {
        repository
            .statuses_for_namespace(NamespaceId::new(namespace_id))
            .await
            .unwrap_or_default()
            .iter()
            .find(|row| row.analyzer_type() == analyzer_type)
            .map(|row| (row.success(), row.failure()))
            .unwrap_or((0, 0))
    }

    #[tokio::test]
    async fn diff_expands_to_every_ancestor_and_clamps_at_zero() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let root = 920_001;
        clear_subtree(&pool, root).await;
        let repository = PostgresNamespaceStatusRepository::new(pool);

        let add = [AnalyzerCounterDelta {
            analyzer_type: AnalyzerType::Sast,
            success: 1,
            failure: 0,
        }];
        let applied = repository
            .apply_counter_deltas(&path(&[root, root + 1, root + 2]), &add)
            .await;
        assert!(applied.is_ok());

        for namespace_id in [root, root + 1, root + 2] {
            assert_eq!(
                counters(&repository, namespace_id, AnalyzerType::Sast).await,
                (1, 0)
            );
        }

        let remove = [AnalyzerCounterDelta {
            analyzer_type: AnalyzerType::Sast,
            success: -1,
            failure: 0,
        }];
        for _ in 0..2 {
            let applied = repository
                .apply_counter_deltas(&path(&[root, root + 1, root + 2]), &remove)
                .await;
            assert!(applied.is_ok());
        }

        // The second remove clamps at zero instead of going negative.
        for namespace_id in [root, root + 1, root + 2] {
            assert_eq!(
                counters(&repository, namespace_id, AnalyzerType::Sast).await,
                (0, 0)
            );
        }
    }

    #[tokio::test]
    async fn fresh_negative_delta_is_clamped_on_insert() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let root = 920_101;
        clear_subtree(&pool, root).await;
        let repository = PostgresNamespaceStatusRepository::new(pool);

        let remove = [AnalyzerCounterDelta {
            analyzer_type: AnalyzerType::Dast,
            success: -1,
            failure: 0,
        }];
        let applied = repository
            .apply_counter_deltas(&path(&[root, root + 1]), &remove)
            .await;
        assert!(applied.is_ok());

        assert_eq!(counters(&repository, root, AnalyzerType::Dast).await, (0, 0));
        assert_eq!(
            counters(&repository, root + 1, AnalyzerType::Dast).await,
            (0, 0)
        );
    }

    #[tokio::test]
    async fn traversal_prefix_rewrite_respects_the_range() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let root = 920_201;
        clear_subtree(&pool, root).await;
        clear_subtree(&pool, root + 1000).await;
        let repository = PostgresNamespaceStatusRepository::new(pool.clone());

        // Rows under [root, root+2], the exact prefix row included, plus an
        // unrelated sibling subtree [root, root+3].
        for path_ids in [
            vec![root, root + 2],
            vec![root, root + 2, root + 9],
            vec![root, root + 3],
        ] {
            let namespace_id = path_ids[path_ids.len() - 1];
            let inserted = sqlx::query(
                r#"
                INSERT INTO analyzer_namespace_statuses
                    (namespace_id, traversal_ids, analyzer_type, success, failure, created_at, updated_at)
                VALUES ($1, $2, 'sast', 1, 0, now(), now())
                "#,
            )
            .bind(namespace_id)
            .bind(path_ids)
            .execute(&pool)
            .await;
            assert!(inserted.is_ok());
        }

        let old_prefix = path(&[root, root + 2]);
        let new_prefix = path(&[root + 1000, root + 2]);
        let page = repository
            .rewrite_traversal_prefix(&old_prefix, &new_prefix, 0, 100)
            .await;
        assert_eq!(page.map(|page| page.rows_affected).ok(), Some(2));

        let rewritten = repository
            .statuses_for_namespace(NamespaceId::new(root + 9))
            .await
            .unwrap_or_default();
        assert_eq!(
            rewritten
                .first()
                .map(|row| row.traversal_ids().to_vec()),
            Some(vec![root + 1000, root + 2, root + 9])
        );

        let untouched = repository
            .statuses_for_namespace(NamespaceId::new(root + 3))
            .await
            .unwrap_or_default();
        assert_eq!(
            untouched
                .first()
                .map(|row| row.traversal_ids().to_vec()),
            Some(vec![root, root + 3])
        );
    }
}
