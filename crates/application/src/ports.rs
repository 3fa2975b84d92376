//! Ports consumed by the aggregation services.

mod events;
mod platform;
mod repository;

pub use events::{AggregationEventKind, AggregationEventQueue, ClaimedAggregationEvent};
pub use platform::{
    ErrorContext, ErrorTracker, FeatureGate, NamespaceRef, PipelineRepository, ProjectRef,
    ProjectRepository, ProjectWithSettings,
};
pub use repository::{
    NamespaceStatusRepository, NewProjectStatus, ProjectStatusRepository, TraversalRewritePage,
};
