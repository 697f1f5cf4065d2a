//! Pending action registry
//!
//! Tracks pods whose eviction is in flight. Shared between the housekeeping
//! loop and the readiness waits it spawns; every operation takes a single
//! lock and none of them is held across an await point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::grouping::group_key;
use crate::model::Pod;

/// An eviction in flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    /// Evicted pod name
    pub pod_name: String,
    /// Workload group of the pod
    pub group: Option<String>,
    /// Node the pod was evicted from
    pub source_node: Option<String>,
    /// When the action was registered
    pub registered_at: DateTime<Utc>,
}

/// Set of in-flight evictions keyed by pod name
#[derive(Debug, Default)]
pub struct PendingActionRegistry {
    actions: Mutex<HashMap<String, PendingAction>>,
}

impl PendingActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A waiter that panicked mid-update leaves the map in a valid state,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingAction>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a pod. Returns false if it was already registered; the
    /// existing entry is kept.
    pub fn add(&self, pod: &Pod) -> bool {
        let mut actions = self.lock();
        if actions.contains_key(&pod.name) {
            return false;
        }
        actions.insert(
            pod.name.clone(),
            PendingAction {
                pod_name: pod.name.clone(),
                group: group_key(pod),
                source_node: pod.node().map(str::to_string),
                registered_at: Utc::now(),
            },
        );
        true
    }

    /// Unregister a pod. Returns false if it was not registered.
    pub fn remove(&self, pod: &Pod) -> bool {
        self.lock().remove(&pod.name).is_some()
    }

    pub fn contains(&self, pod: &Pod) -> bool {
        self.lock().contains_key(&pod.name)
    }

    /// Whether any registered pod belongs to the same workload group
    pub fn group_in_flight(&self, pod: &Pod) -> bool {
        let Some(group) = group_key(pod) else {
            return false;
        };
        self.lock()
            .values()
            .any(|action| action.group.as_deref() == Some(group.as_str()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of all registered actions
    pub fn entries(&self) -> Vec<PendingAction> {
        self.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::pod_on;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_add_remove_contains() {
        let registry = PendingActionRegistry::new();
        let pod = pod_on("web-abc", "web-", "n1");

        assert!(!registry.contains(&pod));
        assert!(registry.add(&pod));
        assert!(registry.contains(&pod));
        assert!(!registry.add(&pod), "duplicate add must be rejected");
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&pod));
        assert!(!registry.contains(&pod));
        assert!(!registry.remove(&pod));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_entry_records_source() {
        let registry = PendingActionRegistry::new();
        registry.add(&pod_on("web-abc", "web-", "n1"));

        let entries = registry.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].group.as_deref(), Some("web"));
        assert_eq!(entries[0].source_node.as_deref(), Some("n1"));
    }

    #[test]
    fn test_group_in_flight() {
        let registry = PendingActionRegistry::new();
        let evicted = pod_on("web-abc", "web-", "n1");
        let sibling = pod_on("web-def", "web-", "n1");
        let other = pod_on("db-0", "db-", "n1");

        assert!(!registry.group_in_flight(&sibling));
        registry.add(&evicted);
        assert!(registry.group_in_flight(&sibling));
        assert!(!registry.group_in_flight(&other));

        let unmanaged = crate::model::Pod::new("static", "default");
        assert!(!registry.group_in_flight(&unmanaged));

        registry.remove(&evicted);
        assert!(!registry.group_in_flight(&sibling));
    }

    #[test]
    fn test_concurrent_distinct_pods() {
        let registry = Arc::new(PendingActionRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        let pod = pod_on(&format!("w{}-{}", t, i), "w-", "n1");
                        assert!(registry.add(&pod));
                        assert!(registry.contains(&pod));
                        if i % 2 == 0 {
                            assert!(registry.remove(&pod));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 8 * 100);
    }

    proptest! {
        /// Interleaved add/remove across threads, each thread owning a
        /// disjoint set of pods, ends in exactly the state a sequential model
        /// predicts.
        #[test]
        fn concurrent_ops_match_model(
            ops in prop::collection::vec(
                prop::collection::vec((0u8..16, any::<bool>()), 1..64),
                2..6,
            )
        ) {
            let registry = Arc::new(PendingActionRegistry::new());

            let handles: Vec<_> = ops
                .iter()
                .cloned()
                .enumerate()
                .map(|(t, thread_ops)| {
                    let registry = registry.clone();
                    thread::spawn(move || {
                        for (id, add) in thread_ops {
                            let pod = pod_on(&format!("t{}-p{}", t, id), "t-", "n1");
                            if add {
                                registry.add(&pod);
                            } else {
                                registry.remove(&pod);
                            }
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let mut expected = std::collections::HashSet::new();
            for (t, thread_ops) in ops.iter().enumerate() {
                for (id, add) in thread_ops {
                    let name = format!("t{}-p{}", t, id);
                    if *add {
                        expected.insert(name);
                    } else {
                        expected.remove(&name);
                    }
                }
            }

            prop_assert_eq!(registry.len(), expected.len());
            for name in &expected {
                prop_assert!(registry.contains(&pod_on(name, "t-", "n1")));
            }
        }
    }
}
