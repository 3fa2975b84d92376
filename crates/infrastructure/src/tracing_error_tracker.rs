//! Error-tracking sink backed by structured logging.

use async_trait::async_trait;
use tracing::error;

use scanledger_application::{ErrorContext, ErrorTracker};
use scanledger_core::AppError;

/// Error tracker emitting one structured `error!` event per swallowed
/// failure, with the triggering ids attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorTracker;

#[async_trait]
impl ErrorTracker for TracingErrorTracker {
    async fn track(&self, error: &AppError, context: ErrorContext) {
        error!(
            project_id = context.project_id.map(|id| id.as_i64()),
            pipeline_id = context.pipeline_id.map(|id| id.as_i64()),
            error = %error,
            "analyzer status aggregation update failed"
        );
    }
}
