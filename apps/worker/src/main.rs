//! Scanledger aggregation worker runtime.
//!
//! Claims platform events from the aggregation queue and dispatches them to
//! the status services. Events are always marked processed, including
//! malformed ones, so a poison payload cannot wedge the queue.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use scanledger_application::{
    AggregationEventKind, AggregationEventQueue, AncestorsUpdateService, ClaimedAggregationEvent,
    DiffService, SettingsBasedUpdateService, UpdateArchivedService,
    UpdateNamespaceTraversalIdsService, UpdateService,
};
use scanledger_core::{AppError, AppResult, TraversalIds};
use scanledger_infrastructure::{
    PostgresAggregationEventQueue, PostgresFeatureGate, PostgresNamespaceStatusRepository,
    PostgresPipelineRepository, PostgresProjectRepository, PostgresProjectStatusRepository,
    TracingErrorTracker,
};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct WorkerConfig {
    database_url: String,
    claim_limit: i64,
    lease_seconds: u32,
    poll_interval_ms: u64,
    rewrite_batch_size: i64,
}

struct Services {
    update: UpdateService,
    settings_based_update: SettingsBasedUpdateService,
    update_archived: UpdateArchivedService,
    update_namespace_traversal_ids: UpdateNamespaceTraversalIdsService,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = WorkerConfig::load()?;
    let pool = connect_pool(config.database_url.as_str()).await?;
    let queue = PostgresAggregationEventQueue::new(pool.clone());
    let services = build_services(pool, config.rewrite_batch_size);

    info!(
        claim_limit = config.claim_limit,
        lease_seconds = config.lease_seconds,
        poll_interval_ms = config.poll_interval_ms,
        "scanledger-worker started"
    );

    loop {
        let events = match queue.claim(config.claim_limit, config.lease_seconds).await {
            Ok(events) => events,
            Err(error) => {
                warn!(error = %error, "failed to claim aggregation events");
                tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
                continue;
            }
        };

        if events.is_empty() {
            tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
            continue;
        }

        let claimed = events.len();
        let mut processed_ids = Vec::with_capacity(events.len());

        for event in events {
            let event_id = event.id;
            dispatch_event(&services, event).await;
            processed_ids.push(event_id);
        }

        if let Err(error) = queue.mark_processed(&processed_ids).await {
            warn!(error = %error, "failed to mark aggregation events processed");
        } else {
            info!(processed = claimed, "processed aggregation events");
        }
    }
}

async fn dispatch_event(services: &Services, event: ClaimedAggregationEvent) {
    let kind = match AggregationEventKind::from_payload(event.payload) {
        Ok(kind) => kind,
        Err(error) => {
            warn!(
                event_id = event.id,
                event_type = event.event_type.as_str(),
                error = %error,
                "skipping malformed aggregation event"
            );
            return;
        }
    };

    match kind {
        AggregationEventKind::PipelineCompleted {
            pipeline_id,
            project_id,
        } => {
            // Failures are tracked and swallowed inside the service.
            services.update.execute(project_id, pipeline_id).await;
        }
        AggregationEventKind::ProjectArchived { project_id } => {
            if let Err(error) = services.update_archived.execute(project_id).await {
                warn!(
                    event_id = event.id,
                    project_id = project_id.as_i64(),
                    error = %error,
                    "archived-flag update failed"
                );
            }
        }
        AggregationEventKind::NamespaceMoved {
            namespace_id,
            previous_traversal_ids,
        } => {
            let previous = TraversalIds::new(previous_traversal_ids).ok();
            match services
                .update_namespace_traversal_ids
                .execute(namespace_id, previous)
                .await
            {
                Ok(rewritten) if rewritten > 0 => {
                    info!(
                        event_id = event.id,
                        namespace_id = namespace_id.as_i64(),
                        rewritten,
                        "rewrote namespace status traversal ids"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(
                        event_id = event.id,
                        namespace_id = namespace_id.as_i64(),
                        error = %error,
                        "traversal-id rewrite failed"
                    );
                }
            }
        }
        AggregationEventKind::SettingsChanged {
            project_ids,
            analyzer_type,
        } => {
            if let Err(error) = services
                .settings_based_update
                .execute(&project_ids, analyzer_type)
                .await
            {
                warn!(
                    event_id = event.id,
                    analyzer_type = analyzer_type.as_str(),
                    error = %error,
                    "settings-based status update failed"
                );
            }
        }
    }
}

fn build_services(pool: PgPool, rewrite_batch_size: i64) -> Services {
    let project_statuses = Arc::new(PostgresProjectStatusRepository::new(pool.clone()));
    let namespace_statuses = Arc::new(PostgresNamespaceStatusRepository::new(pool.clone()));
    let projects = Arc::new(PostgresProjectRepository::new(pool.clone()));
    let pipelines = Arc::new(PostgresPipelineRepository::new(pool.clone()));
    let feature_gate = Arc::new(PostgresFeatureGate::new(pool));
    let error_tracker = Arc::new(TracingErrorTracker);

    let update = UpdateService::new(
        feature_gate.clone(),
        projects.clone(),
        pipelines,
        project_statuses.clone(),
        DiffService::new(project_statuses.clone()),
        AncestorsUpdateService::new(namespace_statuses.clone()),
        error_tracker,
    );
    let settings_based_update = SettingsBasedUpdateService::new(
        projects.clone(),
        project_statuses.clone(),
        feature_gate,
    );
    let update_archived = UpdateArchivedService::new(projects.clone(), project_statuses);
    let update_namespace_traversal_ids =
        UpdateNamespaceTraversalIdsService::new(projects, namespace_statuses, rewrite_batch_size);

    Services {
        update,
        settings_based_update,
        update_archived,
        update_namespace_traversal_ids,
    }
}

async fn connect_pool(database_url: &str) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

impl WorkerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let claim_limit = parse_env_i64("WORKER_CLAIM_LIMIT", 20)?;
        let lease_seconds = parse_env_u32("WORKER_LEASE_SECONDS", 30)?;
        let poll_interval_ms = parse_env_u64("WORKER_POLL_INTERVAL_MS", 1500)?;
        let rewrite_batch_size = parse_env_i64("WORKER_BATCH_SIZE", 500)?;

        if claim_limit <= 0 {
            return Err(AppError::Validation(
                "WORKER_CLAIM_LIMIT must be greater than zero".to_owned(),
            ));
        }

        if lease_seconds == 0 {
            return Err(AppError::Validation(
                "WORKER_LEASE_SECONDS must be greater than zero".to_owned(),
            ));
        }

        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "WORKER_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        if rewrite_batch_size <= 0 {
            return Err(AppError::Validation(
                "WORKER_BATCH_SIZE must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            claim_limit,
            lease_seconds,
            poll_interval_ms,
            rewrite_batch_size,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_i64(name: &str, default: i64) -> AppResult<i64> {
    match env::var(name) {
        Ok(value) => value.parse::<i64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
