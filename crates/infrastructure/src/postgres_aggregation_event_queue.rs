//! PostgreSQL-backed queue of aggregation events.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use scanledger_application::{
    AggregationEventKind, AggregationEventQueue, ClaimedAggregationEvent,
};
use scanledger_core::{AppError, AppResult};

/// Queue adapter claiming events with `FOR UPDATE SKIP LOCKED`.
///
/// A claim takes a bounded lease: events claimed but not marked processed
/// become claimable again once the lease expires, so a crashed worker
/// cannot strand them.
#[derive(Clone)]
pub struct PostgresAggregationEventQueue {
    pool: PgPool,
}

impl PostgresAggregationEventQueue {
    /// Creates a queue with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    event_type: String,
    payload: Value,
}

#[async_trait]
impl AggregationEventQueue for PostgresAggregationEventQueue {
    async fn enqueue(&self, event: &AggregationEventKind) -> AppResult<()> {
        let payload = event.to_payload()?;

        sqlx::query(
            r#"
            INSERT INTO aggregation_events (event_type, payload)
            VALUES ($1, $2)
            "#,
        )
        .bind(event.event_type())
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to enqueue aggregation event: {error}"))
        })?;

        Ok(())
    }

    async fn claim(
        &self,
        limit: i64,
        lease_seconds: u32,
    ) -> AppResult<Vec<ClaimedAggregationEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            UPDATE aggregation_events
            SET claimed_at = now()
            WHERE id IN (
                SELECT id
                FROM aggregation_events
                WHERE processed_at IS NULL
                  AND (claimed_at IS NULL
                       OR claimed_at + make_interval(secs => $2::float8) < now())
                ORDER BY id
                FOR UPDATE SKIP LOCKED
                LIMIT $1
            )
            RETURNING id, event_type, payload
            "#,
        )
        .bind(limit)
        .bind(f64::from(lease_seconds))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to claim aggregation events: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| ClaimedAggregationEvent {
                id: row.id,
                event_type: row.event_type,
                payload: row.payload,
            })
            .collect())
    }

    async fn mark_processed(&self, event_ids: &[i64]) -> AppResult<()> {
        if event_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE aggregation_events
            SET processed_at = now()
            WHERE id = ANY($1::bigint[])
            "#,
        )
        .bind(event_ids.to_vec())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to mark aggregation events processed: {error}"))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use scanledger_application::{AggregationEventKind, AggregationEventQueue};
    use scanledger_core::{PipelineId, ProjectId};

    use super::PostgresAggregationEventQueue;

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
            panic!("failed to run migrations for event queue tests: {error}");
        }

        Some(pool)
    }

    #[tokio::test]
    async fn claimed_events_round_trip_and_stay_processed() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let cleared = sqlx::query("DELETE FROM aggregation_events")
            .execute(&pool)
            .await;
        assert!(cleared.is_ok());

        let queue = PostgresAggregationEventQueue::new(pool);
        let event = AggregationEventKind::PipelineCompleted {
            pipeline_id: PipelineId::new(930_001),
            project_id: ProjectId::new(930_002),
        };

        let enqueued = queue.enqueue(&event).await;
        assert!(enqueued.is_ok());

        let claimed = queue.claim(10, 30).await.unwrap_or_default();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].event_type.as_str(), "pipeline_completed");

        let decoded = AggregationEventKind::from_payload(claimed[0].payload.clone());
        assert_eq!(decoded.ok(), Some(event));

        // Claimed events are leased and invisible to a second claim.
        let reclaimed = queue.claim(10, 30).await.unwrap_or_default();
        assert!(reclaimed.is_empty());

        let marked = queue.mark_processed(&[claimed[0].id]).await;
        assert!(marked.is_ok());

        let after_processing = queue.claim(10, 0).await.unwrap_or_default();
        assert!(after_processing.is_empty());
    }
}
