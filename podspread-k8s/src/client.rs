//! Kubernetes Client wrapper
//!
//! Provides a simplified interface to the Kubernetes API.

use std::path::Path;

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, DeleteParams, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info};

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    /// Create a new K8s client using in-cluster or default kubeconfig
    pub async fn new() -> Result<Self> {
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client")?;

        info!("Connected to Kubernetes API server");
        Ok(Self { client })
    }

    /// Create a new K8s client from an explicit kubeconfig file
    pub async fn with_kubeconfig(path: &Path) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("Failed to read kubeconfig: {:?}", path))?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .with_context(|| format!("Failed to load kubeconfig: {:?}", path))?;

        let client = Self::with_config(config).await?;
        info!(kubeconfig = ?path, "Connected to Kubernetes API server");
        Ok(client)
    }

    /// Create a new K8s client with custom config
    pub async fn with_config(config: Config) -> Result<Self> {
        let client = Client::try_from(config)
            .context("Failed to create Kubernetes client from config")?;

        Ok(Self { client })
    }

    /// Get node API
    pub fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    /// Get pods API for a namespace
    pub fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Check if the API server is reachable
    pub async fn health_check(&self) -> Result<()> {
        let _ = self
            .nodes()
            .list(&ListParams::default().limit(1))
            .await
            .context("Failed to list nodes")?;
        Ok(())
    }

    /// List all nodes
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self
            .nodes()
            .list(&ListParams::default())
            .await
            .context("Failed to list nodes")?;

        Ok(nodes.items)
    }

    /// List pods in a namespace assigned to a specific node
    pub async fn list_pods_on_node(&self, namespace: &str, node_name: &str) -> Result<Vec<Pod>> {
        let params = ListParams::default().fields(&format!("spec.nodeName={}", node_name));

        let pods = self
            .pods(namespace)
            .list(&params)
            .await
            .with_context(|| format!("Failed to list pods on node: {}", node_name))?;

        debug!(node = node_name, count = pods.items.len(), "Listed pods on node");
        Ok(pods.items)
    }

    /// Get a pod by name, `None` if it does not exist
    pub async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>> {
        self.pods(namespace)
            .get_opt(name)
            .await
            .with_context(|| format!("Failed to get pod: {}/{}", namespace, name))
    }

    /// Delete a pod
    pub async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        self.pods(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("Failed to delete pod: {}/{}", namespace, name))?;

        info!(namespace = namespace, pod = name, "Pod deleted");
        Ok(())
    }

    /// Evict a pod through the Eviction API, honouring disruption budgets
    pub async fn evict_pod(&self, namespace: &str, name: &str) -> Result<()> {
        self.pods(namespace)
            .evict(name, &Default::default())
            .await
            .with_context(|| format!("Failed to evict pod: {}/{}", namespace, name))?;

        info!(namespace = namespace, pod = name, "Pod evicted");
        Ok(())
    }
}
