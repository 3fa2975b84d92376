use scanledger_core::{NamespaceId, TraversalIds};

use super::analyzer::AnalyzerType;

/// Aggregate success/failure counts of one analyzer type over every
/// descendant project of a namespace.
///
/// Unique per `(namespace_id, analyzer_type)`. Counters are adjusted
/// incrementally on every project-level status change and never drop below
/// zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerNamespaceStatus {
    namespace_id: NamespaceId,
    analyzer_type: AnalyzerType,
    traversal_ids: TraversalIds,
    success: i64,
    failure: i64,
}

impl AnalyzerNamespaceStatus {
    /// Creates a namespace-level rollup row.
    #[must_use]
    pub fn new(
        namespace_id: NamespaceId,
        analyzer_type: AnalyzerType,
        traversal_ids: TraversalIds,
        success: i64,
        failure: i64,
    ) -> Self {
        Self {
            namespace_id,
            analyzer_type,
            traversal_ids,
            success,
            failure,
        }
    }

    /// Returns the namespace id.
    #[must_use]
    pub fn namespace_id(&self) -> NamespaceId {
        self.namespace_id
    }

    /// Returns the analyzer type.
    #[must_use]
    pub fn analyzer_type(&self) -> AnalyzerType {
        self.analyzer_type
    }

    /// Returns the namespace's own traversal path.
    #[must_use]
    pub fn traversal_ids(&self) -> &TraversalIds {
        &self.traversal_ids
    }

    /// Returns the count of descendant projects currently succeeding.
    #[must_use]
    pub fn success(&self) -> i64 {
        self.success
    }

    /// Returns the count of descendant projects currently failing.
    #[must_use]
    pub fn failure(&self) -> i64 {
        self.failure
    }
}
