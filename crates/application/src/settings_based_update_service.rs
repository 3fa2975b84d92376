use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use scanledger_core::{AppError, AppResult, ProjectId};
use scanledger_domain::{AnalyzerStatus, AnalyzerType};

use super::ports::{
    FeatureGate, NewProjectStatus, ProjectRepository, ProjectStatusRepository, ProjectWithSettings,
};

/// Derives analyzer statuses from project security settings toggles.
///
/// Handles the settings-based analyzer types only; project-level rows are
/// upserted without diffing or ancestor propagation, which is reconciled
/// separately for these types.
#[derive(Clone)]
pub struct SettingsBasedUpdateService {
    projects: Arc<dyn ProjectRepository>,
    project_statuses: Arc<dyn ProjectStatusRepository>,
    feature_gate: Arc<dyn FeatureGate>,
}

impl SettingsBasedUpdateService {
    /// Creates the settings-driven update service.
    #[must_use]
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        project_statuses: Arc<dyn ProjectStatusRepository>,
        feature_gate: Arc<dyn FeatureGate>,
    ) -> Self {
        Self {
            projects,
            project_statuses,
            feature_gate,
        }
    }

    /// Updates one settings-based analyzer type for a batch of projects.
    pub async fn execute(
        &self,
        project_ids: &[ProjectId],
        analyzer_type: AnalyzerType,
    ) -> AppResult<()> {
        if !analyzer_type.is_settings_based() {
            return Err(AppError::Validation(format!(
                "analyzer type '{}' is not settings-based",
                analyzer_type.as_str()
            )));
        }

        if project_ids.is_empty() {
            return Ok(());
        }

        let projects = self.projects.projects_with_settings(project_ids).await?;
        let eligible = self.eligible_projects(projects).await?;
        if eligible.is_empty() {
            return Ok(());
        }

        let sibling_statuses = self.sibling_statuses(&eligible, analyzer_type).await?;

        let last_call = Utc::now();
        let mut rows = Vec::with_capacity(eligible.len() * 2);

        for entry in &eligible {
            let Some(status) = entry.settings.status_for(analyzer_type) else {
                continue;
            };

            rows.push(NewProjectStatus {
                project_id: entry.project.id,
                analyzer_type,
                status,
                traversal_ids: entry.project.traversal_ids.clone(),
                archived: entry.project.archived,
                last_call,
            });

            if let Some(umbrella) = analyzer_type.umbrella() {
                let mut umbrella_status = status;
                if let Some(sibling) = sibling_statuses.get(&entry.project.id) {
                    umbrella_status = umbrella_status.merge(*sibling);
                }

                rows.push(NewProjectStatus {
                    project_id: entry.project.id,
                    analyzer_type: umbrella,
                    status: umbrella_status,
                    traversal_ids: entry.project.traversal_ids.clone(),
                    archived: entry.project.archived,
                    last_call,
                });
            }
        }

        self.project_statuses.upsert_statuses(rows).await
    }

    /// Filters out projects whose root ancestor has the feature disabled,
    /// consulting the gate once per distinct root.
    async fn eligible_projects(
        &self,
        projects: Vec<ProjectWithSettings>,
    ) -> AppResult<Vec<ProjectWithSettings>> {
        let mut roots = projects
            .iter()
            .map(|entry| entry.project.root_ancestor())
            .collect::<Vec<_>>();
        roots.sort_unstable();
        roots.dedup();

        let enabled = self.feature_gate.enabled_namespaces(&roots).await?;

        Ok(projects
            .into_iter()
            .filter(|entry| enabled.contains(&entry.project.root_ancestor()))
            .collect())
    }

    /// Loads the persisted statuses of the umbrella's other member types,
    /// merged per project by priority.
    async fn sibling_statuses(
        &self,
        eligible: &[ProjectWithSettings],
        analyzer_type: AnalyzerType,
    ) -> AppResult<HashMap<ProjectId, AnalyzerStatus>> {
        let Some(umbrella) = analyzer_type.umbrella() else {
            return Ok(HashMap::new());
        };

        let sibling_types = umbrella
            .members()
            .unwrap_or_default()
            .iter()
            .copied()
            .filter(|member| *member != analyzer_type)
            .collect::<Vec<_>>();
        if sibling_types.is_empty() {
            return Ok(HashMap::new());
        }

        let project_ids = eligible
            .iter()
            .map(|entry| entry.project.id)
            .collect::<Vec<_>>();
        let rows = self
            .project_statuses
            .statuses_for_projects(&project_ids, &sibling_types)
            .await?;

        let mut merged = HashMap::new();
        for row in rows {
            merged
                .entry(row.project_id())
                .and_modify(|current: &mut AnalyzerStatus| *current = current.merge(row.status()))
                .or_insert(row.status());
        }

        Ok(merged)
    }
}
