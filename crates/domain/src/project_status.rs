use chrono::{DateTime, Utc};
use scanledger_core::{ProjectId, TraversalIds};

use super::analyzer::AnalyzerType;
use super::status::AnalyzerStatus;

/// Persisted status of one analyzer type for one project.
///
/// Unique per `(project_id, analyzer_type)`. The traversal path always
/// mirrors the project's current namespace path; it is kept in sync
/// reactively when groups move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerProjectStatus {
    project_id: ProjectId,
    analyzer_type: AnalyzerType,
    status: AnalyzerStatus,
    traversal_ids: TraversalIds,
    archived: bool,
    last_call: DateTime<Utc>,
}

impl AnalyzerProjectStatus {
    /// Creates a project-level analyzer status row.
    #[must_use]
    pub fn new(
        project_id: ProjectId,
        analyzer_type: AnalyzerType,
        status: AnalyzerStatus,
        traversal_ids: TraversalIds,
        archived: bool,
        last_call: DateTime<Utc>,
    ) -> Self {
        Self {
            project_id,
            analyzer_type,
            status,
            traversal_ids,
            archived,
            last_call,
        }
    }

    /// Returns the owning project id.
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the analyzer type.
    #[must_use]
    pub fn analyzer_type(&self) -> AnalyzerType {
        self.analyzer_type
    }

    /// Returns the aggregated status.
    #[must_use]
    pub fn status(&self) -> AnalyzerStatus {
        self.status
    }

    /// Returns the project's namespace traversal path.
    #[must_use]
    pub fn traversal_ids(&self) -> &TraversalIds {
        &self.traversal_ids
    }

    /// Returns whether the project or an ancestor is archived.
    #[must_use]
    pub fn archived(&self) -> bool {
        self.archived
    }

    /// Returns the timestamp of the last contributing signal.
    #[must_use]
    pub fn last_call(&self) -> DateTime<Utc> {
        self.last_call
    }
}
