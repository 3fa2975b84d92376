//! In-memory port implementations for service tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use scanledger_core::{
    AppError, AppResult, NamespaceId, PipelineId, ProjectId, TraversalIds,
};
use scanledger_domain::{
    AnalyzerCounterDelta, AnalyzerNamespaceStatus, AnalyzerProjectStatus, AnalyzerStatus,
    AnalyzerType, SecurityJob, SecuritySettings,
};

use crate::ports::{
    ErrorContext, ErrorTracker, FeatureGate, NamespaceRef, NamespaceStatusRepository,
    NewProjectStatus, PipelineRepository, ProjectRef, ProjectRepository, ProjectStatusRepository,
    ProjectWithSettings, TraversalRewritePage,
};

/// Builds a traversal path from raw ids.
pub fn traversal(ids: &[i64]) -> TraversalIds {
    TraversalIds::new(ids.to_vec()).unwrap_or_else(|_| unreachable!())
}

/// Builds an observed status map from pairs.
pub fn statuses(
    entries: &[(AnalyzerType, AnalyzerStatus)],
) -> BTreeMap<AnalyzerType, AnalyzerStatus> {
    entries.iter().copied().collect()
}

fn lock_error(error: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("failed to lock test repository state: {error}"))
}

/// Project-status repository backed by a hash map.
#[derive(Default)]
pub struct InMemoryProjectStatusRepository {
    rows: Mutex<HashMap<(ProjectId, AnalyzerType), AnalyzerProjectStatus>>,
    archived_set: Mutex<bool>,
}

impl InMemoryProjectStatusRepository {
    /// Returns whether `set_archived` was ever called.
    pub fn archived_was_set(&self) -> bool {
        self.archived_set.lock().map(|flag| *flag).unwrap_or(false)
    }

    fn store(
        rows: &mut HashMap<(ProjectId, AnalyzerType), AnalyzerProjectStatus>,
        row: NewProjectStatus,
    ) {
        rows.insert(
            (row.project_id, row.analyzer_type),
            AnalyzerProjectStatus::new(
                row.project_id,
                row.analyzer_type,
                row.status,
                row.traversal_ids,
                row.archived,
                row.last_call,
            ),
        );
    }
}

#[async_trait]
impl ProjectStatusRepository for InMemoryProjectStatusRepository {
    async fn statuses_for_project(
        &self,
        project_id: ProjectId,
    ) -> AppResult<Vec<AnalyzerProjectStatus>> {
        let rows = self.rows.lock().map_err(lock_error)?;
        Ok(rows
            .values()
            .filter(|row| row.project_id() == project_id)
            .cloned()
            .collect())
    }

    async fn statuses_for_projects(
        &self,
        project_ids: &[ProjectId],
        analyzer_types: &[AnalyzerType],
    ) -> AppResult<Vec<AnalyzerProjectStatus>> {
        let rows = self.rows.lock().map_err(lock_error)?;
        Ok(rows
            .values()
            .filter(|row| {
                project_ids.contains(&row.project_id())
                    && analyzer_types.contains(&row.analyzer_type())
            })
            .cloned()
            .collect())
    }

    async fn replace_pipeline_statuses(
        &self,
        project_id: ProjectId,
        rows: Vec<NewProjectStatus>,
    ) -> AppResult<()> {
        let processed = rows
            .iter()
            .map(|row| row.analyzer_type)
            .collect::<HashSet<_>>();

        let mut stored = self.rows.lock().map_err(lock_error)?;
        for row in rows {
            Self::store(&mut stored, row);
        }

        for ((row_project_id, analyzer_type), row) in stored.iter_mut() {
            if *row_project_id == project_id
                && analyzer_type.is_pipeline_based()
                && !processed.contains(analyzer_type)
            {
                *row = AnalyzerProjectStatus::new(
                    row.project_id(),
                    row.analyzer_type(),
                    AnalyzerStatus::NotConfigured,
                    row.traversal_ids().clone(),
                    row.archived(),
                    row.last_call(),
                );
            }
        }

        Ok(())
    }

    async fn upsert_statuses(&self, rows: Vec<NewProjectStatus>) -> AppResult<()> {
        let mut stored = self.rows.lock().map_err(lock_error)?;
        for row in rows {
            Self::store(&mut stored, row);
        }
        Ok(())
    }

    async fn set_archived(&self, project_id: ProjectId, archived: bool) -> AppResult<()> {
        let mut stored = self.rows.lock().map_err(lock_error)?;
        for row in stored.values_mut() {
            if row.project_id() == project_id {
                *row = AnalyzerProjectStatus::new(
                    row.project_id(),
                    row.analyzer_type(),
                    row.status(),
                    row.traversal_ids().clone(),
                    archived,
                    row.last_call(),
                );
            }
        }

        let mut flag = self.archived_set.lock().map_err(lock_error)?;
        *flag = true;
        Ok(())
    }
}

struct NamespaceRow {
    id: i64,
    namespace_id: NamespaceId,
    analyzer_type: AnalyzerType,
    traversal_ids: Vec<i64>,
    success: i64,
    failure: i64,
}

/// Namespace-status repository mirroring the SQL expansion and clamping
/// semantics in memory.
#[derive(Default)]
pub struct InMemoryNamespaceStatusRepository {
    rows: Mutex<Vec<NamespaceRow>>,
    next_id: Mutex<i64>,
}

impl InMemoryNamespaceStatusRepository {
    /// Seeds one rollup row.
    pub fn seed_row(
        &self,
        namespace_id: NamespaceId,
        analyzer_type: AnalyzerType,
        traversal_ids: TraversalIds,
        success: i64,
        failure: i64,
    ) {
        if let (Ok(mut rows), Ok(mut next_id)) = (self.rows.lock(), self.next_id.lock()) {
            *next_id += 1;
            rows.push(NamespaceRow {
                id: *next_id,
                namespace_id,
                analyzer_type,
                traversal_ids: traversal_ids.to_vec(),
                success,
                failure,
            });
        }
    }

    /// Returns the stored traversal path of one namespace's first row.
    pub fn traversal_of(&self, namespace_id: NamespaceId) -> Option<Vec<i64>> {
        self.rows.lock().ok().and_then(|rows| {
            rows.iter()
                .find(|row| row.namespace_id == namespace_id)
                .map(|row| row.traversal_ids.clone())
        })
    }
}

#[async_trait]
impl NamespaceStatusRepository for InMemoryNamespaceStatusRepository {
    async fn apply_counter_deltas(
        &self,
        traversal_ids: &TraversalIds,
        deltas: &[AnalyzerCounterDelta],
    ) -> AppResult<()> {
        let mut rows = self.rows.lock().map_err(lock_error)?;
        let mut next_id = self.next_id.lock().map_err(lock_error)?;
        let path = traversal_ids.as_slice();

        for delta in deltas {
            for level in 1..=path.len() {
                let prefix = &path[..level];
                let namespace_id = NamespaceId::new(prefix[level - 1]);

                if let Some(row) = rows.iter_mut().find(|row| {
                    row.namespace_id == namespace_id && row.analyzer_type == delta.analyzer_type
                }) {
                    row.success = (row.success + delta.success).max(0);
                    row.failure = (row.failure + delta.failure).max(0);
                    row.traversal_ids = prefix.to_vec();
                } else {
                    *next_id += 1;
                    rows.push(NamespaceRow {
                        id: *next_id,
                        namespace_id,
                        analyzer_type: delta.analyzer_type,
                        traversal_ids: prefix.to_vec(),
                        success: delta.success.max(0),
                        failure: delta.failure.max(0),
                    });
                }
            }
        }

        Ok(())
    }

    async fn rewrite_traversal_prefix(
        &self,
        old_prefix: &TraversalIds,
        new_prefix: &TraversalIds,
        after_id: i64,
        limit: i64,
    ) -> AppResult<TraversalRewritePage> {
        let mut rows = self.rows.lock().map_err(lock_error)?;
        let lower = old_prefix.to_vec();
        let upper = old_prefix.upper_bound();

        let mut matching = rows
            .iter_mut()
            .filter(|row| {
                row.id > after_id
                    && row.traversal_ids.as_slice() >= lower.as_slice()
                    && row.traversal_ids.as_slice() < upper.as_slice()
            })
            .collect::<Vec<_>>();
        matching.sort_by_key(|row| row.id);

        let mut rows_affected = 0_u64;
        let mut last_id = None;

        for row in matching.into_iter().take(limit.max(0) as usize) {
            let path = TraversalIds::new(row.traversal_ids.clone())?;
            if let Some(rewritten) = path.replace_prefix(old_prefix, new_prefix) {
                row.traversal_ids = rewritten.to_vec();
            }
            rows_affected += 1;
            last_id = Some(row.id);
        }

        Ok(TraversalRewritePage {
            rows_affected,
            last_id,
        })
    }

    async fn statuses_for_namespace(
        &self,
        namespace_id: NamespaceId,
    ) -> AppResult<Vec<AnalyzerNamespaceStatus>> {
        let rows = self.rows.lock().map_err(lock_error)?;
        rows.iter()
            .filter(|row| row.namespace_id == namespace_id)
            .map(|row| {
                Ok(AnalyzerNamespaceStatus::new(
                    row.namespace_id,
                    row.analyzer_type,
                    TraversalIds::new(row.traversal_ids.clone())?,
                    row.success,
                    row.failure,
                ))
            })
            .collect()
    }
}

/// Namespace-status repository whose writes always fail.
pub struct FailingNamespaceStatusRepository;

#[async_trait]
impl NamespaceStatusRepository for FailingNamespaceStatusRepository {
    async fn apply_counter_deltas(
        &self,
        _traversal_ids: &TraversalIds,
        _deltas: &[AnalyzerCounterDelta],
    ) -> AppResult<()> {
        Err(AppError::Internal(
            "namespace status write rejected by test double".to_owned(),
        ))
    }

    async fn rewrite_traversal_prefix(
        &self,
        _old_prefix: &TraversalIds,
        _new_prefix: &TraversalIds,
        _after_id: i64,
        _limit: i64,
    ) -> AppResult<TraversalRewritePage> {
        Err(AppError::Internal(
            "namespace status write rejected by test double".to_owned(),
        ))
    }

    async fn statuses_for_namespace(
        &self,
        _namespace_id: NamespaceId,
    ) -> AppResult<Vec<AnalyzerNamespaceStatus>> {
        Ok(Vec::new())
    }
}

/// Project/namespace read port backed by hash maps.
#[derive(Default)]
pub struct StubProjectRepository {
    projects: HashMap<ProjectId, ProjectWithSettings>,
    namespaces: HashMap<NamespaceId, NamespaceRef>,
    effective_archived: HashMap<ProjectId, bool>,
}

impl StubProjectRepository {
    /// Creates a repository holding one project with default settings.
    pub fn with_project(project_id: ProjectId, traversal_ids: TraversalIds, archived: bool) -> Self {
        let mut repository = Self::default();
        repository.add_project_with_settings(
            project_id,
            traversal_ids,
            archived,
            SecuritySettings::default(),
        );
        repository
    }

    /// Adds one project with explicit settings.
    pub fn add_project_with_settings(
        &mut self,
        project_id: ProjectId,
        traversal_ids: TraversalIds,
        archived: bool,
        settings: SecuritySettings,
    ) {
        let namespace_id = traversal_ids.namespace_id();
        self.projects.insert(
            project_id,
            ProjectWithSettings {
                project: ProjectRef {
                    id: project_id,
                    namespace_id,
                    traversal_ids,
                    archived,
                },
                settings,
            },
        );
    }

    /// Adds one namespace.
    pub fn add_namespace(
        &mut self,
        namespace_id: NamespaceId,
        traversal_ids: TraversalIds,
        archived: bool,
    ) {
        self.namespaces.insert(
            namespace_id,
            NamespaceRef {
                id: namespace_id,
                traversal_ids,
                archived,
            },
        );
    }

    /// Overrides the effective archived answer for one project.
    pub fn set_effective_archived(&mut self, project_id: ProjectId, archived: bool) {
        self.effective_archived.insert(project_id, archived);
    }
}

#[async_trait]
impl ProjectRepository for StubProjectRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<ProjectRef>> {
        Ok(self
            .projects
            .get(&project_id)
            .map(|entry| entry.project.clone()))
    }

    async fn find_namespace(&self, namespace_id: NamespaceId) -> AppResult<Option<NamespaceRef>> {
        Ok(self.namespaces.get(&namespace_id).cloned())
    }

    async fn projects_with_settings(
        &self,
        project_ids: &[ProjectId],
    ) -> AppResult<Vec<ProjectWithSettings>> {
        Ok(project_ids
            .iter()
            .filter_map(|project_id| self.projects.get(project_id).cloned())
            .collect())
    }

    async fn effective_archived(&self, project_id: ProjectId) -> AppResult<Option<bool>> {
        if let Some(archived) = self.effective_archived.get(&project_id) {
            return Ok(Some(*archived));
        }

        Ok(self
            .projects
            .get(&project_id)
            .map(|entry| entry.project.archived))
    }
}

/// Pipeline read port returning a fixed job list for one pipeline.
pub struct StubPipelineRepository {
    pipeline_id: PipelineId,
    jobs: Vec<SecurityJob>,
}

impl StubPipelineRepository {
    /// Creates a repository answering for one pipeline.
    pub fn new(pipeline_id: PipelineId, jobs: Vec<SecurityJob>) -> Self {
        Self { pipeline_id, jobs }
    }
}

#[async_trait]
impl PipelineRepository for StubPipelineRepository {
    async fn completed_security_jobs(
        &self,
        pipeline_id: PipelineId,
    ) -> AppResult<Vec<SecurityJob>> {
        if pipeline_id == self.pipeline_id {
            Ok(self.jobs.clone())
        } else {
            Ok(Vec::new())
        }
    }
}

/// Feature gate with a fixed set of enabled namespaces.
pub struct StaticFeatureGate {
    enabled: HashSet<NamespaceId>,
}

impl StaticFeatureGate {
    /// Creates a gate enabled for the given namespace ids.
    pub fn enabled_for(namespace_ids: &[i64]) -> Self {
        Self {
            enabled: namespace_ids.iter().map(|id| NamespaceId::new(*id)).collect(),
        }
    }

    /// Creates a gate disabled everywhere.
    pub fn disabled() -> Self {
        Self {
            enabled: HashSet::new(),
        }
    }
}

#[async_trait]
impl FeatureGate for StaticFeatureGate {
    async fn enabled_for_namespace(&self, namespace_id: NamespaceId) -> AppResult<bool> {
        Ok(self.enabled.contains(&namespace_id))
    }

    async fn enabled_namespaces(
        &self,
        namespace_ids: &[NamespaceId],
    ) -> AppResult<HashSet<NamespaceId>> {
        Ok(namespace_ids
            .iter()
            .filter(|namespace_id| self.enabled.contains(namespace_id))
            .copied()
            .collect())
    }
}

/// Error tracker recording every tracked error.
#[derive(Default)]
pub struct RecordingErrorTracker {
    tracked: Mutex<Vec<(String, ErrorContext)>>,
}

impl RecordingErrorTracker {
    /// Returns the tracked errors.
    pub fn tracked(&self) -> Vec<(String, ErrorContext)> {
        self.tracked
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ErrorTracker for RecordingErrorTracker {
    async fn track(&self, error: &AppError, context: ErrorContext) {
        if let Ok(mut entries) = self.tracked.lock() {
            entries.push((error.to_string(), context));
        }
    }
}
