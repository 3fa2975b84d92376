use std::sync::Arc;

use scanledger_core::{AppResult, NamespaceId, TraversalIds};

use super::ports::{NamespaceStatusRepository, ProjectRepository};

/// Rewrites rollup traversal paths after a group is moved or renamed.
///
/// Rows previously addressed under the old prefix are found with a
/// lexicographic array range query and rewritten in id-keyed batches, so no
/// single statement runs unbounded.
#[derive(Clone)]
pub struct UpdateNamespaceTraversalIdsService {
    projects: Arc<dyn ProjectRepository>,
    namespace_statuses: Arc<dyn NamespaceStatusRepository>,
    batch_size: i64,
}

impl UpdateNamespaceTraversalIdsService {
    /// Creates the traversal-id maintenance service.
    #[must_use]
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        namespace_statuses: Arc<dyn NamespaceStatusRepository>,
        batch_size: i64,
    ) -> Self {
        Self {
            projects,
            namespace_statuses,
            batch_size: batch_size.max(1),
        }
    }

    /// Rewrites every rollup row under the namespace's previous traversal
    /// path. Returns the number of rewritten rows.
    ///
    /// No-ops when the previous path is unknown, the namespace is gone, or
    /// the path did not actually change.
    pub async fn execute(
        &self,
        namespace_id: NamespaceId,
        previous_traversal_ids: Option<TraversalIds>,
    ) -> AppResult<u64> {
        let Some(previous) = previous_traversal_ids else {
            return Ok(0);
        };

        let Some(namespace) = self.projects.find_namespace(namespace_id).await? else {
            return Ok(0);
        };

        if namespace.traversal_ids == previous {
            return Ok(0);
        }

        let mut total = 0_u64;
        let mut cursor = 0_i64;

        loop {
            let page = self
                .namespace_statuses
                .rewrite_traversal_prefix(&previous, &namespace.traversal_ids, cursor, self.batch_size)
                .await?;

            total += page.rows_affected;

            match page.last_id {
                Some(last_id) if page.rows_affected >= self.batch_size as u64 => cursor = last_id,
                _ => break,
            }
        }

        Ok(total)
    }
}
