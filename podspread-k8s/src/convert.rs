//! Conversions from Kubernetes API objects to podspread model types.

use k8s_openapi::api::core::v1 as k8s;
use podspread_core::model::{Node, Pod, PodPhase, Taint};

/// Convert a Kubernetes [`k8s::Node`] to a model [`Node`].
pub fn node_from_k8s(node: &k8s::Node) -> Node {
    let spec = node.spec.as_ref();

    Node {
        name: node.metadata.name.clone().unwrap_or_default(),
        unschedulable: spec.and_then(|s| s.unschedulable).unwrap_or(false),
        taints: spec
            .and_then(|s| s.taints.as_ref())
            .map(|taints| taints.iter().map(taint_from_k8s).collect())
            .unwrap_or_default(),
    }
}

fn taint_from_k8s(taint: &k8s::Taint) -> Taint {
    Taint {
        key: taint.key.clone(),
        value: taint.value.clone(),
        effect: taint.effect.clone(),
    }
}

/// Convert a Kubernetes [`k8s::Pod`] to a model [`Pod`].
///
/// Missing status maps to phase `Unknown` with no container readiness, so
/// the pod is never considered ready.
pub fn pod_from_k8s(pod: &k8s::Pod) -> Pod {
    let meta = &pod.metadata;
    let status = pod.status.as_ref();

    Pod {
        name: meta.name.clone().unwrap_or_default(),
        namespace: meta.namespace.clone().unwrap_or_else(|| "default".to_string()),
        generate_name: meta.generate_name.clone().filter(|g| !g.is_empty()),
        uid: meta.uid.clone(),
        node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        phase: status
            .and_then(|s| s.phase.as_deref())
            .map(PodPhase::parse)
            .unwrap_or_default(),
        container_ready: status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|statuses| statuses.iter().map(|c| c.ready).collect())
            .unwrap_or_default(),
        pod_ip: status.and_then(|s| s.pod_ip.clone()),
        terminating: meta.deletion_timestamp.is_some(),
    }
}
