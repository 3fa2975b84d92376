use std::collections::BTreeMap;
use std::sync::Arc;

use scanledger_core::{AppResult, ProjectId};
use scanledger_domain::{AnalyzerStatus, AnalyzerType, StatusDiff};

use super::ports::ProjectStatusRepository;

/// Computes per-analyzer-type status transition deltas for one project.
///
/// Compares newly observed pipeline statuses against the project's
/// persisted rows and returns the signed delta map to apply to every
/// ancestor namespace. Pure read: no persistence side effects.
#[derive(Clone)]
pub struct DiffService {
    project_statuses: Arc<dyn ProjectStatusRepository>,
}

impl DiffService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(project_statuses: Arc<dyn ProjectStatusRepository>) -> Self {
        Self { project_statuses }
    }

    /// Returns the diff between persisted state and `observed`.
    ///
    /// Only pipeline-based rows participate in the absence rule: a
    /// settings-based row missing from a pipeline observation is owned by
    /// the settings path and must not transition to `not_configured` here.
    pub async fn execute(
        &self,
        project_id: ProjectId,
        observed: &BTreeMap<AnalyzerType, AnalyzerStatus>,
    ) -> AppResult<StatusDiff> {
        let persisted = self.project_statuses.statuses_for_project(project_id).await?;
        let existing = persisted
            .iter()
            .filter(|row| row.analyzer_type().is_pipeline_based())
            .map(|row| (row.analyzer_type(), row.status()))
            .collect::<BTreeMap<_, _>>();

        Ok(StatusDiff::between(&existing, observed))
    }
}
