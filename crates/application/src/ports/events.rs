use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use scanledger_core::{AppError, AppResult, NamespaceId, PipelineId, ProjectId};
use scanledger_domain::AnalyzerType;

/// Internal platform events the aggregation reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AggregationEventKind {
    /// A CI pipeline finished.
    PipelineCompleted {
        /// The completed pipeline.
        pipeline_id: PipelineId,
        /// The project the pipeline ran for.
        project_id: ProjectId,
    },
    /// A project was archived or unarchived.
    ProjectArchived {
        /// The affected project.
        project_id: ProjectId,
    },
    /// A group was moved or renamed, changing its traversal path.
    NamespaceMoved {
        /// The moved namespace.
        namespace_id: NamespaceId,
        /// The traversal path before the move.
        previous_traversal_ids: Vec<i64>,
    },
    /// Security settings toggles changed for a batch of projects.
    SettingsChanged {
        /// The affected projects.
        project_ids: Vec<ProjectId>,
        /// The settings-based analyzer type that changed.
        analyzer_type: AnalyzerType,
    },
}

impl AggregationEventKind {
    /// Returns the stable event type value used on the queue.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PipelineCompleted { .. } => "pipeline_completed",
            Self::ProjectArchived { .. } => "project_archived",
            Self::NamespaceMoved { .. } => "namespace_moved",
            Self::SettingsChanged { .. } => "settings_changed",
        }
    }

    /// Decodes a claimed queue payload.
    pub fn from_payload(payload: Value) -> AppResult<Self> {
        serde_json::from_value(payload).map_err(|error| {
            AppError::Validation(format!("invalid aggregation event payload: {error}"))
        })
    }

    /// Encodes this event into a queue payload.
    pub fn to_payload(&self) -> AppResult<Value> {
        serde_json::to_value(self).map_err(|error| {
            AppError::Internal(format!("failed to encode aggregation event payload: {error}"))
        })
    }
}

/// One claimed, not yet processed queue event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedAggregationEvent {
    /// Queue row id.
    pub id: i64,
    /// Stable event type value.
    pub event_type: String,
    /// Raw JSON payload.
    pub payload: Value,
}

/// Queue port the worker claims aggregation events from.
#[async_trait]
pub trait AggregationEventQueue: Send + Sync {
    /// Appends one event to the queue.
    async fn enqueue(&self, event: &AggregationEventKind) -> AppResult<()>;

    /// Claims up to `limit` unprocessed events with a bounded lease.
    async fn claim(&self, limit: i64, lease_seconds: u32)
    -> AppResult<Vec<ClaimedAggregationEvent>>;

    /// Marks claimed events as processed.
    async fn mark_processed(&self, event_ids: &[i64]) -> AppResult<()>;
}
