//! Workload grouping
//!
//! Pods created by the same controller share a name-generation prefix
//! (`web-7f9c4-` for a ReplicaSet, `db-` for a StatefulSet). The prefix minus
//! its trailing separator is used as the workload group key.

use std::collections::HashMap;

use crate::model::Pod;

/// Derive the workload group key for a pod.
///
/// Returns `None` for pods without a generation prefix; such pods are
/// unmanaged and never considered for eviction.
pub fn group_key(pod: &Pod) -> Option<String> {
    let prefix = pod.generate_name.as_deref()?;
    let mut key = prefix.to_string();
    key.pop()?;
    if key.is_empty() {
        return None;
    }
    Some(key)
}

/// Group pods by workload key, preserving encounter order within each group.
pub fn group_pods<'a, I>(pods: I) -> HashMap<String, Vec<Pod>>
where
    I: IntoIterator<Item = &'a Pod>,
{
    let mut groups: HashMap<String, Vec<Pod>> = HashMap::new();
    for pod in pods {
        if let Some(key) = group_key(pod) {
            groups.entry(key).or_default().push(pod.clone());
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::pod_on;

    fn unmanaged(name: &str) -> Pod {
        Pod::new(name, "default")
    }

    #[test]
    fn test_group_key_strips_separator() {
        let pod = pod_on("web-abc", "web-", "n1");
        assert_eq!(group_key(&pod).as_deref(), Some("web"));

        let pod = pod_on("api-6d4cf-x8k2p", "api-6d4cf-", "n1");
        assert_eq!(group_key(&pod).as_deref(), Some("api-6d4cf"));
    }

    #[test]
    fn test_group_key_without_prefix() {
        assert_eq!(group_key(&unmanaged("standalone")), None);

        let mut pod = unmanaged("odd");
        pod.generate_name = Some(String::new());
        assert_eq!(group_key(&pod), None);

        pod.generate_name = Some("-".to_string());
        assert_eq!(group_key(&pod), None);
    }

    #[test]
    fn test_group_pods_preserves_order() {
        let pods = vec![
            pod_on("web-1", "web-", "n1"),
            pod_on("db-0", "db-", "n2"),
            unmanaged("static-pod"),
            pod_on("web-2", "web-", "n2"),
            pod_on("web-3", "web-", "n1"),
        ];

        let groups = group_pods(&pods);
        assert_eq!(groups.len(), 2);

        let web: Vec<&str> = groups["web"].iter().map(|p| p.name.as_str()).collect();
        assert_eq!(web, vec!["web-1", "web-2", "web-3"]);
        assert_eq!(groups["db"].len(), 1);
    }

    #[test]
    fn test_unmanaged_pods_never_grouped() {
        let pods = vec![unmanaged("a"), unmanaged("b"), pod_on("web-1", "web-", "n1")];
        let groups = group_pods(&pods);

        for members in groups.values() {
            assert!(members.iter().all(|p| p.generate_name.is_some()));
            assert!(!members.iter().any(|p| p.name == "a" || p.name == "b"));
        }
    }
}
