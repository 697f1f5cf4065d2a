//! Colocation analysis
//!
//! Finds a replica that shares its node with another replica of the same
//! workload. Evicting it lets the scheduler place the replacement on a node
//! that does not yet run the workload.

use std::collections::HashMap;

use crate::model::Pod;

/// Find at most one movable pod in a workload group.
///
/// Pods already being deleted are ignored entirely. Every other Running pod
/// counts toward the replica tally, even with a container not ready, but only
/// pods with every container ready can be candidates. Pods are scanned in
/// order; the first time a node is seen hosting a second ready pod, the pod
/// recorded first on that node becomes the candidate. Nodes already holding
/// two or more members do not trigger again.
///
/// The whole group is always scanned so the tally is complete before the
/// candidate is approved. A group whose tally is below `min_replicas` yields
/// nothing.
pub fn find_movable_pod(group_pods: &[Pod], min_replicas: usize) -> Option<&Pod> {
    let mut by_node: HashMap<&str, Vec<&Pod>> = HashMap::new();
    let mut running = 0usize;
    let mut candidate: Option<&Pod> = None;

    for pod in group_pods.iter().filter(|p| p.is_running() && !p.terminating) {
        running += 1;
        if !pod.is_ready() {
            continue;
        }

        let Some(node) = pod.node() else {
            continue;
        };
        let colocated = by_node.entry(node).or_default();
        if candidate.is_none() && colocated.len() == 1 {
            candidate = Some(colocated[0]);
        }
        colocated.push(pod);
    }

    if running < min_replicas {
        return None;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::pod_on;
    use crate::model::PodPhase;

    fn not_ready(mut pod: Pod) -> Pod {
        pod.container_ready = vec![true, false];
        pod
    }

    fn terminating(mut pod: Pod) -> Pod {
        pod.terminating = true;
        pod
    }

    fn pending(mut pod: Pod) -> Pod {
        pod.phase = PodPhase::Pending;
        pod
    }

    #[test]
    fn test_pair_on_same_node() {
        let pods = vec![pod_on("web-abc", "web-", "n1"), pod_on("web-def", "web-", "n1")];
        let movable = find_movable_pod(&pods, 2).unwrap();
        assert_eq!(movable.name, "web-abc");
    }

    #[test]
    fn test_spread_group_has_no_candidate() {
        let pods = vec![
            pod_on("web-1", "web-", "n1"),
            pod_on("web-2", "web-", "n2"),
            pod_on("web-3", "web-", "n3"),
        ];
        assert!(find_movable_pod(&pods, 1).is_none());
    }

    #[test]
    fn test_below_min_replicas() {
        let pods = vec![pod_on("web-1", "web-", "n1")];
        assert!(find_movable_pod(&pods, 2).is_none());

        let pods = vec![pod_on("web-1", "web-", "n1"), pod_on("web-2", "web-", "n1")];
        assert!(find_movable_pod(&pods, 3).is_none());
        assert!(find_movable_pod(&pods, 2).is_some());
    }

    #[test]
    fn test_count_covers_pods_after_candidate() {
        // Candidate is found at the second pod; the third pod must still be
        // counted before the replica gate is applied.
        let pods = vec![
            pod_on("web-1", "web-", "n1"),
            pod_on("web-2", "web-", "n1"),
            pod_on("web-3", "web-", "n2"),
        ];
        assert_eq!(find_movable_pod(&pods, 3).unwrap().name, "web-1");
        assert!(find_movable_pod(&pods, 4).is_none());
    }

    #[test]
    fn test_isolated_pod_never_chosen() {
        let pods = vec![
            pod_on("web-solo", "web-", "n2"),
            pod_on("web-a", "web-", "n1"),
            pod_on("web-b", "web-", "n1"),
        ];
        let movable = find_movable_pod(&pods, 2).unwrap();
        assert!(movable.name == "web-a" || movable.name == "web-b");
    }

    #[test]
    fn test_not_ready_pods_ignored() {
        let pods = vec![
            not_ready(pod_on("web-1", "web-", "n1")),
            pod_on("web-2", "web-", "n1"),
        ];
        assert!(find_movable_pod(&pods, 1).is_none());

        let pods = vec![
            pending(pod_on("web-1", "web-", "n1")),
            pod_on("web-2", "web-", "n1"),
            pod_on("web-3", "web-", "n1"),
        ];
        assert_eq!(find_movable_pod(&pods, 2).unwrap().name, "web-2");
    }

    #[test]
    fn test_not_ready_pods_count_toward_min_replicas() {
        let pods = vec![
            pod_on("web-1", "web-", "n1"),
            pod_on("web-2", "web-", "n1"),
            not_ready(pod_on("web-3", "web-", "n2")),
        ];
        assert_eq!(find_movable_pod(&pods, 3).unwrap().name, "web-1");
        assert!(find_movable_pod(&pods, 4).is_none());

        // Pending pods are not part of the tally.
        let pods = vec![
            pod_on("web-1", "web-", "n1"),
            pod_on("web-2", "web-", "n1"),
            pending(pod_on("web-3", "web-", "n2")),
        ];
        assert!(find_movable_pod(&pods, 3).is_none());
    }

    #[test]
    fn test_terminating_pods_ignored() {
        let pods = vec![
            terminating(pod_on("web-1", "web-", "n1")),
            pod_on("web-2", "web-", "n1"),
        ];
        assert!(find_movable_pod(&pods, 1).is_none());
        assert!(find_movable_pod(&pods, 2).is_none());

        let pods = vec![
            terminating(pod_on("web-1", "web-", "n1")),
            pod_on("web-2", "web-", "n1"),
            pod_on("web-3", "web-", "n1"),
        ];
        assert_eq!(find_movable_pod(&pods, 2).unwrap().name, "web-2");
        assert!(find_movable_pod(&pods, 3).is_none());
    }

    #[test]
    fn test_first_pair_wins() {
        let pods = vec![
            pod_on("web-1", "web-", "n1"),
            pod_on("web-2", "web-", "n2"),
            pod_on("web-3", "web-", "n2"),
            pod_on("web-4", "web-", "n1"),
        ];
        assert_eq!(find_movable_pod(&pods, 2).unwrap().name, "web-2");
    }

    #[test]
    fn test_result_is_running_and_ready() {
        let pods = vec![
            pending(pod_on("web-1", "web-", "n1")),
            not_ready(pod_on("web-2", "web-", "n1")),
            pod_on("web-3", "web-", "n1"),
            pod_on("web-4", "web-", "n1"),
        ];
        let movable = find_movable_pod(&pods, 1).unwrap();
        assert!(movable.is_running_and_ready());
        assert_eq!(movable.name, "web-3");
    }
}
