//! Cluster snapshot
//!
//! A read-only view of eligible nodes and their pods for one housekeeping
//! tick. Tainted and cordoned nodes are dropped up front, together with
//! their pods, so they are never an eviction source or destination.

use std::collections::BTreeMap;

use tracing::debug;

use crate::cluster::{ClusterApi, ClusterError};
use crate::model::{Node, Pod};

/// Point-in-time view of the cluster
#[derive(Debug, Clone, Default)]
pub struct ClusterSnapshot {
    eligible_nodes: BTreeMap<String, Node>,
    pods_by_node: BTreeMap<String, Vec<Pod>>,
    all_pods: Vec<Pod>,
}

impl ClusterSnapshot {
    /// Build a snapshot through the cluster API.
    ///
    /// Any listing failure aborts the whole snapshot; a partial view is
    /// never returned.
    pub async fn acquire(cluster: &dyn ClusterApi) -> Result<Self, ClusterError> {
        let nodes = cluster.list_nodes().await?;
        let total = nodes.len();

        let mut eligible = Vec::new();
        for node in nodes.into_iter().filter(Node::is_eligible) {
            let pods = cluster.list_pods(&node.name).await?;
            eligible.push((node, pods));
        }

        debug!(
            nodes = total,
            eligible = eligible.len(),
            "Cluster snapshot acquired"
        );
        Ok(Self::from_listing(eligible))
    }

    /// Build a snapshot from in-memory nodes and pods.
    ///
    /// Pods are attached to their assigned node; pods on ineligible nodes
    /// and unscheduled pods are dropped.
    pub fn from_parts(nodes: Vec<Node>, pods: Vec<Pod>) -> Self {
        let mut eligible_nodes = BTreeMap::new();
        let mut pods_by_node: BTreeMap<String, Vec<Pod>> = BTreeMap::new();

        for node in nodes.into_iter().filter(Node::is_eligible) {
            pods_by_node.insert(node.name.clone(), Vec::new());
            eligible_nodes.insert(node.name.clone(), node);
        }

        for pod in pods {
            let assigned = pod.node().and_then(|name| pods_by_node.get_mut(name));
            if let Some(assigned) = assigned {
                assigned.push(pod);
            }
        }

        Self::assemble(eligible_nodes, pods_by_node)
    }

    fn from_listing(listing: Vec<(Node, Vec<Pod>)>) -> Self {
        let mut eligible_nodes = BTreeMap::new();
        let mut pods_by_node = BTreeMap::new();

        for (node, pods) in listing {
            pods_by_node.insert(node.name.clone(), pods);
            eligible_nodes.insert(node.name.clone(), node);
        }

        Self::assemble(eligible_nodes, pods_by_node)
    }

    fn assemble(
        eligible_nodes: BTreeMap<String, Node>,
        pods_by_node: BTreeMap<String, Vec<Pod>>,
    ) -> Self {
        let all_pods = pods_by_node.values().flatten().cloned().collect();
        Self {
            eligible_nodes,
            pods_by_node,
            all_pods,
        }
    }

    /// Eligible nodes in name order
    pub fn eligible_nodes(&self) -> impl Iterator<Item = &Node> {
        self.eligible_nodes.values()
    }

    /// Look up an eligible node by name
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.eligible_nodes.get(name)
    }

    /// Pods assigned to an eligible node
    pub fn pods_on(&self, node_name: &str) -> &[Pod] {
        self.pods_by_node
            .get(node_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every pod on an eligible node
    pub fn all_pods(&self) -> &[Pod] {
        &self.all_pods
    }

    pub fn node_count(&self) -> usize {
        self.eligible_nodes.len()
    }
}
