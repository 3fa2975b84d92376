use async_trait::async_trait;
use chrono::{DateTime, Utc};

use scanledger_core::{AppResult, NamespaceId, ProjectId, TraversalIds};
use scanledger_domain::{
    AnalyzerCounterDelta, AnalyzerNamespaceStatus, AnalyzerProjectStatus, AnalyzerStatus,
    AnalyzerType,
};

/// Input row for a project-level analyzer status upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProjectStatus {
    /// Owning project id.
    pub project_id: ProjectId,
    /// Analyzer type the row tracks.
    pub analyzer_type: AnalyzerType,
    /// Newly derived status.
    pub status: AnalyzerStatus,
    /// Current namespace traversal path of the project.
    pub traversal_ids: TraversalIds,
    /// Archived flag carried onto the row.
    pub archived: bool,
    /// Timestamp of the contributing signal.
    pub last_call: DateTime<Utc>,
}

/// Repository port for project-level analyzer statuses.
#[async_trait]
pub trait ProjectStatusRepository: Send + Sync {
    /// Returns all analyzer status rows of one project.
    async fn statuses_for_project(
        &self,
        project_id: ProjectId,
    ) -> AppResult<Vec<AnalyzerProjectStatus>>;

    /// Returns status rows for a batch of projects restricted to the given
    /// analyzer types.
    async fn statuses_for_projects(
        &self,
        project_ids: &[ProjectId],
        analyzer_types: &[AnalyzerType],
    ) -> AppResult<Vec<AnalyzerProjectStatus>>;

    /// Upserts the given rows and, in the same transaction, downgrades every
    /// other pipeline-based row of the project to `not_configured`.
    ///
    /// Settings-based and umbrella rows are owned by the settings update
    /// path and must not be touched by the downgrade.
    async fn replace_pipeline_statuses(
        &self,
        project_id: ProjectId,
        rows: Vec<NewProjectStatus>,
    ) -> AppResult<()>;

    /// Batch-upserts rows unique by `(project_id, analyzer_type)` without
    /// downgrading anything.
    async fn upsert_statuses(&self, rows: Vec<NewProjectStatus>) -> AppResult<()>;

    /// Writes the archived flag onto all analyzer-status rows and related
    /// inventory filter rows of the project, in one transaction.
    async fn set_archived(&self, project_id: ProjectId, archived: bool) -> AppResult<()>;
}

/// One page of a cursor-based traversal-prefix rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalRewritePage {
    /// Rows rewritten in this batch.
    pub rows_affected: u64,
    /// Highest row id touched, the cursor for the next batch.
    pub last_id: Option<i64>,
}

/// Repository port for namespace-level rollups.
#[async_trait]
pub trait NamespaceStatusRepository: Send + Sync {
    /// Applies one project's counter deltas to every ancestor namespace in
    /// the traversal path, atomically.
    ///
    /// Each delta is expanded across every prefix length of the path,
    /// aggregated per `(namespace_id, analyzer_type)` and applied with a
    /// single conflict-resolving upsert whose counters are clamped at zero.
    async fn apply_counter_deltas(
        &self,
        traversal_ids: &TraversalIds,
        deltas: &[AnalyzerCounterDelta],
    ) -> AppResult<()>;

    /// Rewrites `old_prefix` to `new_prefix` for one batch of rollup rows
    /// addressed under the old prefix, keyed on row id.
    async fn rewrite_traversal_prefix(
        &self,
        old_prefix: &TraversalIds,
        new_prefix: &TraversalIds,
        after_id: i64,
        limit: i64,
    ) -> AppResult<TraversalRewritePage>;

    /// Returns all rollup rows of one namespace.
    async fn statuses_for_namespace(
        &self,
        namespace_id: NamespaceId,
    ) -> AppResult<Vec<AnalyzerNamespaceStatus>>;
}
