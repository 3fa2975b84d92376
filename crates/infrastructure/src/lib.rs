//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod postgres_aggregation_event_queue;
mod postgres_feature_gate;
mod postgres_namespace_status_repository;
mod postgres_pipeline_repository;
mod postgres_project_repository;
mod postgres_project_status_repository;
mod tracing_error_tracker;

pub use postgres_aggregation_event_queue::PostgresAggregationEventQueue;
pub use postgres_feature_gate::PostgresFeatureGate;
pub use postgres_namespace_status_repository::PostgresNamespaceStatusRepository;
pub use postgres_pipeline_repository::PostgresPipelineRepository;
pub use postgres_project_repository::PostgresProjectRepository;
pub use postgres_project_status_repository::PostgresProjectStatusRepository;
pub use tracing_error_tracker::TracingErrorTracker;
