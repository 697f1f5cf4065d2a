//! Target node selection
//!
//! Checks that at least one eligible node is free of the workload before a
//! replica is evicted. The choice is advisory: the cluster scheduler places
//! the replacement, this only confirms a conflict-free node exists.

use crate::grouping::group_key;
use crate::model::Node;
use crate::snapshot::ClusterSnapshot;

/// Find an eligible node that hosts no pod of `group`.
///
/// Nodes are visited in name order and the first conflict-free node is
/// returned. Capacity, tolerations and affinity are not evaluated.
pub fn find_node_for_group<'a>(snapshot: &'a ClusterSnapshot, group: &str) -> Option<&'a Node> {
    snapshot.eligible_nodes().find(|node| {
        !snapshot
            .pods_on(&node.name)
            .iter()
            .any(|pod| group_key(pod).as_deref() == Some(group))
    })
}
