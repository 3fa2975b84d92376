//! Application services and ports for analyzer status aggregation.

#![forbid(unsafe_code)]

mod ancestors_update_service;
mod diff_service;
mod ports;
mod settings_based_update_service;
mod update_archived_service;
mod update_namespace_traversal_ids_service;
mod update_service;

#[cfg(test)]
mod test_support;

pub use ancestors_update_service::AncestorsUpdateService;
pub use diff_service::DiffService;
pub use ports::{
    AggregationEventKind, AggregationEventQueue, ClaimedAggregationEvent, ErrorContext,
    ErrorTracker, FeatureGate, NamespaceRef, NamespaceStatusRepository, NewProjectStatus,
    PipelineRepository, ProjectRef, ProjectRepository, ProjectStatusRepository,
    ProjectWithSettings, TraversalRewritePage,
};
pub use settings_based_update_service::SettingsBasedUpdateService;
pub use update_archived_service::UpdateArchivedService;
pub use update_namespace_traversal_ids_service::UpdateNamespaceTraversalIdsService;
pub use update_service::UpdateService;
