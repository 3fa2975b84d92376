//! Shared primitives for all Rust crates in Scanledger.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Scanledger crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Identifier of a project.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProjectId(i64);

impl ProjectId {
    /// Creates a project identifier from a raw database id.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for ProjectId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifier of a namespace (group or user namespace).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NamespaceId(i64);

impl NamespaceId {
    /// Creates a namespace identifier from a raw database id.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for NamespaceId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Identifier of a CI pipeline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PipelineId(i64);

impl PipelineId {
    /// Creates a pipeline identifier from a raw database id.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for PipelineId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Ordered namespace-id path from the root ancestor down to (and including)
/// the owning namespace.
///
/// The path doubles as an array-prefix index: all descendants of a namespace
/// sort lexicographically between the namespace's own path and the path with
/// its last element incremented.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraversalIds(Vec<i64>);

impl TraversalIds {
    /// Creates a validated traversal path.
    pub fn new(ids: Vec<i64>) -> AppResult<Self> {
        if ids.is_empty() {
            return Err(AppError::Validation(
                "traversal ids must not be empty".to_owned(),
            ));
        }

        Ok(Self(ids))
    }

    /// Returns the root ancestor namespace id.
    #[must_use]
    pub fn root(&self) -> NamespaceId {
        NamespaceId::new(self.0[0])
    }

    /// Returns the owning namespace id (last path element).
    #[must_use]
    pub fn namespace_id(&self) -> NamespaceId {
        NamespaceId::new(self.0[self.0.len() - 1])
    }

    /// Returns the path depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the path has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw id slice.
    #[must_use]
    pub fn as_slice(&self) -> &[i64] {
        self.0.as_slice()
    }

    /// Returns an owned copy of the raw ids.
    #[must_use]
    pub fn to_vec(&self) -> Vec<i64> {
        self.0.clone()
    }

    /// Returns `true` when this path starts with the given prefix.
    #[must_use]
    pub fn starts_with(&self, prefix: &TraversalIds) -> bool {
        self.0.starts_with(prefix.as_slice())
    }

    /// Returns the exclusive upper bound of the subtree rooted at this path:
    /// the path with its last element incremented. Together with the path
    /// itself this forms the lexicographic array range covering every
    /// descendant.
    #[must_use]
    pub fn upper_bound(&self) -> Vec<i64> {
        let mut bound = self.0.clone();
        let last = bound.len() - 1;
        bound[last] = bound[last].saturating_add(1);
        bound
    }

    /// Substitutes `old_prefix` with `new_prefix`, preserving the suffix.
    ///
    /// Returns `None` when this path does not start with `old_prefix`.
    #[must_use]
    pub fn replace_prefix(
        &self,
        old_prefix: &TraversalIds,
        new_prefix: &TraversalIds,
    ) -> Option<Self> {
        if !self.starts_with(old_prefix) {
            return None;
        }

        let mut ids = new_prefix.to_vec();
        ids.extend_from_slice(&self.0[old_prefix.len()..]);
        Some(Self(ids))
    }
}

impl Display for TraversalIds {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("/");
        write!(formatter, "{rendered}")
    }
}
