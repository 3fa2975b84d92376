use std::collections::HashSet;

use async_trait::async_trait;

use scanledger_core::{AppError, AppResult, NamespaceId, PipelineId, ProjectId, TraversalIds};
use scanledger_domain::{SecurityJob, SecuritySettings};

/// Project reference with the hierarchy data the services need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    /// Project id.
    pub id: ProjectId,
    /// Immediate namespace id.
    pub namespace_id: NamespaceId,
    /// Current namespace traversal path.
    pub traversal_ids: TraversalIds,
    /// The project's own archived flag.
    pub archived: bool,
}

impl ProjectRef {
    /// Returns the root ancestor namespace id.
    #[must_use]
    pub fn root_ancestor(&self) -> NamespaceId {
        self.traversal_ids.root()
    }
}

/// Project reference joined with its security settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectWithSettings {
    /// The project.
    pub project: ProjectRef,
    /// Its security toggles; defaults when no settings row exists.
    pub settings: SecuritySettings,
}

/// Namespace reference with its current traversal path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceRef {
    /// Namespace id.
    pub id: NamespaceId,
    /// Current traversal path.
    pub traversal_ids: TraversalIds,
    /// The namespace's own archived flag.
    pub archived: bool,
}

/// Read port for projects and namespaces owned by the surrounding platform.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Returns one project with its hierarchy data.
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<ProjectRef>>;

    /// Returns one namespace with its current traversal path.
    async fn find_namespace(&self, namespace_id: NamespaceId) -> AppResult<Option<NamespaceRef>>;

    /// Returns a batch of projects joined with their security settings.
    async fn projects_with_settings(
        &self,
        project_ids: &[ProjectId],
    ) -> AppResult<Vec<ProjectWithSettings>>;

    /// Returns whether the project or any ancestor namespace is archived,
    /// or `None` when the project does not exist.
    async fn effective_archived(&self, project_id: ProjectId) -> AppResult<Option<bool>>;
}

/// Read port for completed pipeline scan jobs.
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Returns the completed security-scanning jobs of one pipeline.
    async fn completed_security_jobs(
        &self,
        pipeline_id: PipelineId,
    ) -> AppResult<Vec<SecurityJob>>;
}

/// Feature-flag oracle keyed by root namespace.
#[async_trait]
pub trait FeatureGate: Send + Sync {
    /// Returns whether aggregation is enabled for one namespace.
    async fn enabled_for_namespace(&self, namespace_id: NamespaceId) -> AppResult<bool>;

    /// Returns the subset of the given namespaces with aggregation enabled.
    async fn enabled_namespaces(
        &self,
        namespace_ids: &[NamespaceId],
    ) -> AppResult<HashSet<NamespaceId>>;
}

/// Identifier context attached to tracked errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Project the failed operation was updating, if known.
    pub project_id: Option<ProjectId>,
    /// Pipeline that triggered the failed operation, if known.
    pub pipeline_id: Option<PipelineId>,
}

/// Fire-and-forget error sink.
///
/// Aggregation updates are best-effort: callers report failures here and
/// carry on instead of propagating them to the triggering event.
#[async_trait]
pub trait ErrorTracker: Send + Sync {
    /// Records one swallowed error with its id context.
    async fn track(&self, error: &AppError, context: ErrorContext);
}
