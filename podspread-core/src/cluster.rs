//! Cluster API abstraction
//!
//! The operations the decision engine needs from the orchestration platform.
//! Implementations must be thread-safe; readiness waits call `get_pod`
//! concurrently with the main housekeeping loop.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Node, Pod};

/// Errors returned by cluster API calls.
///
/// All variants are transient from the engine's point of view: the current
/// tick (or group step) is abandoned and the next tick starts over.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Listing nodes failed
    #[error("Failed to list nodes: {0}")]
    ListNodes(String),

    /// Listing pods on a node failed
    #[error("Failed to list pods on node {node}: {message}")]
    ListPods { node: String, message: String },

    /// Fetching a pod failed
    #[error("Failed to get pod {pod}: {message}")]
    GetPod { pod: String, message: String },

    /// Deleting a pod failed
    #[error("Failed to delete pod {pod}: {message}")]
    DeletePod { pod: String, message: String },
}

/// Cluster collaborator
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// List all nodes in the cluster
    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError>;

    /// List pods assigned to a node
    async fn list_pods(&self, node_name: &str) -> Result<Vec<Pod>, ClusterError>;

    /// Fetch a pod by name; `Ok(None)` when it does not exist
    async fn get_pod(&self, name: &str) -> Result<Option<Pod>, ClusterError>;

    /// Delete a pod so its controller creates a replacement
    async fn delete_pod(&self, name: &str) -> Result<(), ClusterError>;
}
