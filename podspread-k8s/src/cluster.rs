//! Cluster API backed by Kubernetes
//!
//! Implements the decision engine's `ClusterApi` for a single namespace.

use async_trait::async_trait;
use tracing::info;

use podspread_core::cluster::{ClusterApi, ClusterError};
use podspread_core::model::{Node, Pod};

use super::client::K8sClient;
use super::convert::{node_from_k8s, pod_from_k8s};

/// How a redundant pod is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionMode {
    /// Plain pod deletion
    #[default]
    Delete,
    /// Eviction subresource, which respects PodDisruptionBudgets
    Evict,
}

/// Kubernetes-backed cluster for one namespace
pub struct KubeCluster {
    client: K8sClient,
    namespace: String,
    mode: EvictionMode,
}

impl KubeCluster {
    /// Create a new cluster adapter
    pub fn new(client: K8sClient, namespace: String, mode: EvictionMode) -> Self {
        info!(namespace = %namespace, mode = ?mode, "Watching namespace");
        Self {
            client,
            namespace,
            mode,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        let nodes = self
            .client
            .list_nodes()
            .await
            .map_err(|e| ClusterError::ListNodes(format!("{:#}", e)))?;

        Ok(nodes.iter().map(node_from_k8s).collect())
    }

    async fn list_pods(&self, node_name: &str) -> Result<Vec<Pod>, ClusterError> {
        let pods = self
            .client
            .list_pods_on_node(&self.namespace, node_name)
            .await
            .map_err(|e| ClusterError::ListPods {
                node: node_name.to_string(),
                message: format!("{:#}", e),
            })?;

        Ok(pods.iter().map(pod_from_k8s).collect())
    }

    async fn get_pod(&self, name: &str) -> Result<Option<Pod>, ClusterError> {
        let pod = self
            .client
            .get_pod(&self.namespace, name)
            .await
            .map_err(|e| ClusterError::GetPod {
                pod: name.to_string(),
                message: format!("{:#}", e),
            })?;

        Ok(pod.as_ref().map(pod_from_k8s))
    }

    async fn delete_pod(&self, name: &str) -> Result<(), ClusterError> {
        let result = match self.mode {
            EvictionMode::Delete => self.client.delete_pod(&self.namespace, name).await,
            EvictionMode::Evict => self.client.evict_pod(&self.namespace, name).await,
        };

        result.map_err(|e| ClusterError::DeletePod {
            pod: name.to_string(),
            message: format!("{:#}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_delete() {
        assert_eq!(EvictionMode::default(), EvictionMode::Delete);
    }
}
