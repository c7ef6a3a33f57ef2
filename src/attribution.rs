//! Hand-off of container namespace mappings to the event attribution side of
//! the agent.
use dashmap::DashMap;

use crate::container::{ContainerID, NamespaceIds};

/// Receiver of namespace mappings discovered for containers.
pub trait NamespaceAttribution: Send + Sync {
    fn register(&self, container_id: &ContainerID, namespaces: NamespaceIds);
    fn unregister(&self, container_id: &ContainerID);
}

/// In-process mapping between containers and their namespace inodes.
///
/// Kernel events carry `(pid_ns, mnt_ns)`; [`NsMap::container_for`] turns them
/// back into a container id.
#[derive(Debug, Default)]
pub struct NsMap {
    by_container: DashMap<ContainerID, NamespaceIds>,
    by_namespaces: DashMap<NamespaceIds, ContainerID>,
}

impl NsMap {
    pub fn namespaces_of(&self, container_id: &ContainerID) -> Option<NamespaceIds> {
        self.by_container.get(container_id).map(|ns| *ns)
    }

    pub fn container_for(&self, namespaces: NamespaceIds) -> Option<ContainerID> {
        self.by_namespaces.get(&namespaces).map(|id| id.clone())
    }

    pub fn size(&self) -> usize {
        self.by_container.len()
    }
}

impl NamespaceAttribution for NsMap {
    fn register(&self, container_id: &ContainerID, namespaces: NamespaceIds) {
        if let Some(previous) = self.by_container.insert(container_id.clone(), namespaces) {
            self.by_namespaces
                .remove_if(&previous, |_, owner| owner == container_id);
        }
        if !namespaces.is_unresolved() {
            self.by_namespaces.insert(namespaces, container_id.clone());
        }
        log::debug!(
            "Registered namespaces of {} (pid_ns={}, mnt_ns={})",
            container_id.short(),
            namespaces.pid_ns,
            namespaces.mnt_ns
        );
    }

    fn unregister(&self, container_id: &ContainerID) {
        if let Some((_, previous)) = self.by_container.remove(container_id) {
            self.by_namespaces
                .remove_if(&previous, |_, owner| owner == container_id);
            log::debug!("Unregistered namespaces of {}", container_id.short());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> ContainerID {
        ContainerID::new(raw).unwrap()
    }

    #[test]
    fn test_register_and_lookup_both_ways() {
        let map = NsMap::default();
        let ns = NamespaceIds::new(10, 20);
        map.register(&id("c1"), ns);

        assert_eq!(map.namespaces_of(&id("c1")), Some(ns));
        assert_eq!(map.container_for(ns), Some(id("c1")));
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn test_unregister_drops_both_directions() {
        let map = NsMap::default();
        let ns = NamespaceIds::new(10, 20);
        map.register(&id("c1"), ns);
        map.unregister(&id("c1"));

        assert_eq!(map.namespaces_of(&id("c1")), None);
        assert_eq!(map.container_for(ns), None);
        map.unregister(&id("c1"));
    }

    #[test]
    fn test_unresolved_namespaces_are_not_reverse_indexed() {
        let map = NsMap::default();
        map.register(&id("c1"), NamespaceIds::default());
        map.register(&id("c2"), NamespaceIds::default());

        assert_eq!(map.container_for(NamespaceIds::default()), None);
        assert_eq!(map.size(), 2);
    }

    #[test]
    fn test_reregister_replaces_reverse_entry() {
        let map = NsMap::default();
        map.register(&id("c1"), NamespaceIds::new(1, 2));
        map.register(&id("c1"), NamespaceIds::new(3, 4));

        assert_eq!(map.container_for(NamespaceIds::new(1, 2)), None);
        assert_eq!(map.container_for(NamespaceIds::new(3, 4)), Some(id("c1")));
    }
}
