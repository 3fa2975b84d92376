use std::sync::Arc;

use chrono::Utc;

use scanledger_core::{AppResult, PipelineId, ProjectId};
use scanledger_domain::observed_statuses;

use super::ancestors_update_service::AncestorsUpdateService;
use super::diff_service::DiffService;
use super::ports::{
    ErrorContext, ErrorTracker, FeatureGate, NewProjectStatus, PipelineRepository,
    ProjectRepository, ProjectStatusRepository,
};

/// Derives analyzer statuses from a completed CI pipeline and persists them.
///
/// Best-effort: every failure is reported to the error tracker and
/// swallowed, because a broken status rollup must never fail the pipeline
/// that triggered it.
#[derive(Clone)]
pub struct UpdateService {
    feature_gate: Arc<dyn FeatureGate>,
    projects: Arc<dyn ProjectRepository>,
    pipelines: Arc<dyn PipelineRepository>,
    project_statuses: Arc<dyn ProjectStatusRepository>,
    diff_service: DiffService,
    ancestors_update_service: AncestorsUpdateService,
    error_tracker: Arc<dyn ErrorTracker>,
}

impl UpdateService {
    /// Creates the pipeline-driven update service.
    #[must_use]
    pub fn new(
        feature_gate: Arc<dyn FeatureGate>,
        projects: Arc<dyn ProjectRepository>,
        pipelines: Arc<dyn PipelineRepository>,
        project_statuses: Arc<dyn ProjectStatusRepository>,
        diff_service: DiffService,
        ancestors_update_service: AncestorsUpdateService,
        error_tracker: Arc<dyn ErrorTracker>,
    ) -> Self {
        Self {
            feature_gate,
            projects,
            pipelines,
            project_statuses,
            diff_service,
            ancestors_update_service,
            error_tracker,
        }
    }

    /// Processes one completed pipeline.
    pub async fn execute(&self, project_id: ProjectId, pipeline_id: PipelineId) {
        if let Err(error) = self.update(project_id, pipeline_id).await {
            self.error_tracker
                .track(
                    &error,
                    ErrorContext {
                        project_id: Some(project_id),
                        pipeline_id: Some(pipeline_id),
                    },
                )
                .await;
        }
    }

    async fn update(&self, project_id: ProjectId, pipeline_id: PipelineId) -> AppResult<()> {
        let Some(project) = self.projects.find_project(project_id).await? else {
            return Ok(());
        };

        let enabled = self
            .feature_gate
            .enabled_for_namespace(project.root_ancestor())
            .await?;
        if !enabled {
            return Ok(());
        }

        let jobs = self.pipelines.completed_security_jobs(pipeline_id).await?;
        if jobs.is_empty() {
            // Indistinguishable from a deleted pipeline: leave statuses alone.
            return Ok(());
        }

        let observed = observed_statuses(&jobs);

        // Diff against persisted state before writing, so re-running the
        // same pipeline yields an empty diff and no double counting.
        let diff = self.diff_service.execute(project_id, &observed).await?;

        let last_call = Utc::now();
        let rows = observed
            .iter()
            .map(|(analyzer_type, status)| NewProjectStatus {
                project_id,
                analyzer_type: *analyzer_type,
                status: *status,
                traversal_ids: project.traversal_ids.clone(),
                archived: project.archived,
                last_call,
            })
            .collect::<Vec<_>>();

        self.project_statuses
            .replace_pipeline_statuses(project_id, rows)
            .await?;

        self.ancestors_update_service
            .execute(&project.traversal_ids, &diff)
            .await
    }
}
