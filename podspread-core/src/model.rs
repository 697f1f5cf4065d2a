//! Cluster model types
//!
//! Minimal, client-agnostic views of nodes and pods. The Kubernetes layer
//! converts API objects into these so the decision engine never depends on
//! a particular client library.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Node taint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taint {
    /// Taint key
    pub key: String,
    /// Taint value (optional)
    pub value: Option<String>,
    /// Taint effect (NoSchedule, PreferNoSchedule, NoExecute)
    pub effect: String,
}

/// A cluster node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Node name
    pub name: String,
    /// Whether the node is cordoned
    #[serde(default)]
    pub unschedulable: bool,
    /// Taints applied to the node
    #[serde(default)]
    pub taints: Vec<Taint>,
}

impl Node {
    /// Create a schedulable, untainted node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unschedulable: false,
            taints: Vec::new(),
        }
    }

    /// A node is eligible as an eviction source or destination only when it
    /// is schedulable and carries no taints.
    pub fn is_eligible(&self) -> bool {
        !self.unschedulable && self.taints.is_empty()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Pod lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    Unknown,
}

impl PodPhase {
    /// Parse a phase string as reported by the API server.
    ///
    /// Anything unrecognised maps to `Unknown`.
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl fmt::Display for PodPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PodPhase::Pending => write!(f, "Pending"),
            PodPhase::Running => write!(f, "Running"),
            PodPhase::Succeeded => write!(f, "Succeeded"),
            PodPhase::Failed => write!(f, "Failed"),
            PodPhase::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A pod instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    /// Pod name
    pub name: String,
    /// Namespace the pod lives in
    pub namespace: String,
    /// Name-generation prefix assigned by the owning controller
    pub generate_name: Option<String>,
    /// Pod UID, distinguishes incarnations sharing a name
    pub uid: Option<String>,
    /// Node the pod is assigned to
    pub node_name: Option<String>,
    /// Lifecycle phase
    pub phase: PodPhase,
    /// Per-container readiness flags
    pub container_ready: Vec<bool>,
    /// Pod IP address
    pub pod_ip: Option<String>,
    /// Whether a deletion timestamp is set
    #[serde(default)]
    pub terminating: bool,
}

impl Pod {
    /// Create a pending, unscheduled pod with no containers reported
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            generate_name: None,
            uid: None,
            node_name: None,
            phase: PodPhase::Pending,
            container_ready: Vec::new(),
            pod_ip: None,
            terminating: false,
        }
    }

    /// Node assignment, treating an empty name as unscheduled
    pub fn node(&self) -> Option<&str> {
        self.node_name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn is_running(&self) -> bool {
        self.phase == PodPhase::Running
    }

    /// True when at least one container is reported and all of them are ready
    pub fn is_ready(&self) -> bool {
        !self.container_ready.is_empty() && self.container_ready.iter().all(|r| *r)
    }

    pub fn is_running_and_ready(&self) -> bool {
        self.is_running() && self.is_ready()
    }

    /// Whether this pod is a new incarnation standing in for `evicted`.
    ///
    /// A terminating pod never counts. When both UIDs are known they must
    /// differ; otherwise the name match alone is accepted.
    pub fn is_replacement_of(&self, evicted: &Pod) -> bool {
        if self.terminating {
            return false;
        }
        match (&self.uid, &evicted.uid) {
            (Some(current), Some(previous)) => current != previous,
            _ => true,
        }
    }
}

impl fmt::Display for Pod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
