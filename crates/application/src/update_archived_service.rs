use std::sync::Arc;

use scanledger_core::{AppResult, ProjectId};

use super::ports::{ProjectRepository, ProjectStatusRepository};

/// Keeps the archived flag of analyzer-status rows consistent after a
/// project is archived or unarchived.
///
/// Flag-only maintenance: success/failure counters are untouched.
#[derive(Clone)]
pub struct UpdateArchivedService {
    projects: Arc<dyn ProjectRepository>,
    project_statuses: Arc<dyn ProjectStatusRepository>,
}

impl UpdateArchivedService {
    /// Creates the archived-flag maintenance service.
    #[must_use]
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        project_statuses: Arc<dyn ProjectStatusRepository>,
    ) -> Self {
        Self {
            projects,
            project_statuses,
        }
    }

    /// Recomputes and writes the effective archived flag for one project.
    ///
    /// No-ops when the project has no analyzer-status rows or no longer
    /// exists.
    pub async fn execute(&self, project_id: ProjectId) -> AppResult<()> {
        let existing = self.project_statuses.statuses_for_project(project_id).await?;
        if existing.is_empty() {
            return Ok(());
        }

        let Some(archived) = self.projects.effective_archived(project_id).await? else {
            return Ok(());
        };

        self.project_statuses.set_archived(project_id, archived).await
    }
}
