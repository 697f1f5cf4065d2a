//! In-memory cluster for testing

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::cluster::{ClusterApi, ClusterError};
use crate::model::{Node, Pod, PodPhase};

/// What the simulated controller does after a pod is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Replacement {
    /// Pod disappears and is never recreated
    #[default]
    Never,
    /// A new, fully ready incarnation appears immediately
    Ready,
    /// A new incarnation appears but stays Pending
    Pending,
}

#[derive(Default)]
struct MockState {
    nodes: Vec<Node>,
    pods: Vec<Pod>,
    fail_list_nodes: bool,
    fail_list_pods: HashSet<String>,
    fail_delete: bool,
    replacement: Replacement,
    list_pods_calls: Vec<String>,
    deleted: Vec<String>,
    get_calls: usize,
}

/// Mock cluster backed by in-memory node and pod lists
#[derive(Default)]
pub struct MockCluster {
    state: Mutex<MockState>,
}

impl MockCluster {
    pub fn new(nodes: Vec<Node>, pods: Vec<Pod>) -> Self {
        Self {
            state: Mutex::new(MockState {
                nodes,
                pods,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `list_nodes` fail
    pub fn fail_list_nodes(&self, fail: bool) {
        self.state().fail_list_nodes = fail;
    }

    /// Make `list_pods` fail for one node
    pub fn fail_list_pods_on(&self, node: &str) {
        self.state().fail_list_pods.insert(node.to_string());
    }

    /// Make `delete_pod` fail
    pub fn fail_delete(&self, fail: bool) {
        self.state().fail_delete = fail;
    }

    /// Set how deleted pods are replaced
    pub fn set_replacement(&self, replacement: Replacement) {
        self.state().replacement = replacement;
    }

    /// Insert or overwrite a pod by name
    pub fn put_pod(&self, pod: Pod) {
        let mut state = self.state();
        state.pods.retain(|p| p.name != pod.name);
        state.pods.push(pod);
    }

    /// Names of deleted pods, in call order
    pub fn deleted(&self) -> Vec<String> {
        self.state().deleted.clone()
    }

    /// Node names passed to `list_pods`, in call order
    pub fn list_pods_calls(&self) -> Vec<String> {
        self.state().list_pods_calls.clone()
    }

    /// Number of `get_pod` calls
    pub fn get_calls(&self) -> usize {
        self.state().get_calls
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        let state = self.state();
        if state.fail_list_nodes {
            return Err(ClusterError::ListNodes("mock failure".to_string()));
        }
        Ok(state.nodes.clone())
    }

    async fn list_pods(&self, node_name: &str) -> Result<Vec<Pod>, ClusterError> {
        let mut state = self.state();
        state.list_pods_calls.push(node_name.to_string());
        if state.fail_list_pods.contains(node_name) {
            return Err(ClusterError::ListPods {
                node: node_name.to_string(),
                message: "mock failure".to_string(),
            });
        }
        Ok(state
            .pods
            .iter()
            .filter(|p| p.node() == Some(node_name))
            .cloned()
            .collect())
    }

    async fn get_pod(&self, name: &str) -> Result<Option<Pod>, ClusterError> {
        let mut state = self.state();
        state.get_calls += 1;
        Ok(state.pods.iter().find(|p| p.name == name).cloned())
    }

    async fn delete_pod(&self, name: &str) -> Result<(), ClusterError> {
        let mut state = self.state();
        if state.fail_delete {
            return Err(ClusterError::DeletePod {
                pod: name.to_string(),
                message: "mock failure".to_string(),
            });
        }

        let Some(index) = state.pods.iter().position(|p| p.name == name) else {
            return Err(ClusterError::DeletePod {
                pod: name.to_string(),
                message: "not found".to_string(),
            });
        };
        let evicted = state.pods.remove(index);
        state.deleted.push(name.to_string());

        let replacement = match state.replacement {
            Replacement::Never => None,
            Replacement::Ready => Some((PodPhase::Running, true)),
            Replacement::Pending => Some((PodPhase::Pending, false)),
        };
        if let Some((phase, ready)) = replacement {
            let uid = format!("{}-next", evicted.uid.as_deref().unwrap_or("uid"));
            let containers = evicted.container_ready.len().max(1);
            state.pods.push(Pod {
                uid: Some(uid),
                node_name: None,
                phase,
                container_ready: vec![ready; containers],
                pod_ip: None,
                terminating: false,
                ..evicted
            });
        }
        Ok(())
    }
}

/// Running, fully ready pod of workload `generate_name` on `node`
pub fn pod_on(name: &str, generate_name: &str, node: &str) -> Pod {
    Pod {
        generate_name: Some(generate_name.to_string()),
        uid: Some(format!("uid-{}", name)),
        node_name: Some(node.to_string()),
        phase: PodPhase::Running,
        container_ready: vec![true],
        pod_ip: Some("10.0.0.1".to_string()),
        ..Pod::new(name, "default")
    }
}
