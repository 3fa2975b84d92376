use std::sync::Arc;

use scanledger_core::{AppResult, TraversalIds};
use scanledger_domain::StatusDiff;

use super::ports::NamespaceStatusRepository;

/// Propagates one project's status diff to every ancestor namespace rollup.
///
/// The expansion across traversal-path prefixes and the clamped
/// conflict-resolving upsert happen inside the repository in a single
/// statement, so concurrent sibling updates cannot lose increments.
#[derive(Clone)]
pub struct AncestorsUpdateService {
    namespace_statuses: Arc<dyn NamespaceStatusRepository>,
}

impl AncestorsUpdateService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(namespace_statuses: Arc<dyn NamespaceStatusRepository>) -> Self {
        Self { namespace_statuses }
    }

    /// Applies the diff to every ancestor in the traversal path.
    ///
    /// No-ops when the diff carries no nonzero success/failure delta.
    pub async fn execute(&self, traversal_ids: &TraversalIds, diff: &StatusDiff) -> AppResult<()> {
        let deltas = diff.counter_deltas();
        if deltas.is_empty() {
            return Ok(());
        }

        self.namespace_statuses
            .apply_counter_deltas(traversal_ids, &deltas)
            .await
    }
}
