//! podspread core library
//!
//! Decision engine for spreading replicated workloads across nodes.
//! This crate provides the cluster model, workload grouping, colocation
//! analysis, target node selection, pending action tracking and the
//! housekeeping orchestrator.

pub mod cluster;
pub mod colocation;
pub mod grouping;
pub mod metrics;
pub mod mock;
pub mod model;
pub mod orchestrator;
pub mod placement;
pub mod poll;
pub mod registry;
pub mod snapshot;

// Re-export common types
pub use cluster::{ClusterApi, ClusterError};
pub use colocation::find_movable_pod;
pub use grouping::{group_key, group_pods};
pub use model::{Node, Pod, PodPhase, Taint};
pub use orchestrator::{
    GroupDecision, OrchestratorConfig, ReadinessOutcome, ReschedulingOrchestrator, TickReport,
};
pub use placement::find_node_for_group;
pub use registry::{PendingAction, PendingActionRegistry};
pub use snapshot::ClusterSnapshot;
