//! Shared registry of running containers and the pods (endpoints) owning them.
//!
//! Containers and endpoints live behind two independent locks. Every
//! operation takes the container lock, releases it, and only then takes the
//! endpoint lock; the two are never held together. Collaborators touching
//! endpoints on their own therefore cannot deadlock against discovery.
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::container::{Container, ContainerID, Endpoint};

/// Result of [`Registry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The container was not known and has been inserted.
    Inserted,
    /// The container was known without namespace ids and has been completed.
    Completed,
    /// The container is already fully resolved; nothing changed.
    Rejected,
}

impl UpsertOutcome {
    pub fn is_accepted(self) -> bool {
        !matches!(self, UpsertOutcome::Rejected)
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    containers: Mutex<HashMap<ContainerID, Container>>,
    endpoints: Mutex<Vec<Endpoint>>,
}

// Each critical section leaves both collections valid, so a panic in another
// holder does not invalidate the data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Registry {
    /// Merges a freshly discovered container into the registry.
    ///
    /// * Unknown id: the record is inserted as is.
    /// * Known id with both namespace ids unset: the existing ownership,
    ///   name, image, labels and policy/visibility flags are kept while the
    ///   profile, rootfs, runtime facts and namespace ids of `container` are
    ///   adopted.
    /// * Known, resolved id: rejected without mutation.
    ///
    /// On success the container (and its profile) is linked to its endpoint,
    /// if one matches its `(namespace_name, endpoint_name)`.
    pub fn upsert(&self, container: Container) -> UpsertOutcome {
        let (outcome, linked, previous_profile) = {
            let mut containers = lock(&self.containers);
            match containers.entry(container.container_id.clone()) {
                Entry::Vacant(entry) => {
                    let linked = entry.insert(container).clone();
                    (UpsertOutcome::Inserted, linked, None)
                }
                Entry::Occupied(mut entry) => {
                    let existing = entry.get_mut();
                    if !existing.namespaces().is_unresolved() {
                        return UpsertOutcome::Rejected;
                    }

                    let previous_profile = std::mem::replace(
                        &mut existing.app_armor_profile,
                        container.app_armor_profile,
                    );
                    existing.merged_dir = container.merged_dir;
                    existing.sandbox_id = container.sandbox_id;
                    existing.privileged = container.privileged;
                    existing.pid_ns = container.pid_ns;
                    existing.mnt_ns = container.mnt_ns;

                    (
                        UpsertOutcome::Completed,
                        existing.clone(),
                        Some(previous_profile),
                    )
                }
            }
        };

        let mut endpoints = lock(&self.endpoints);
        if let Some(endpoint) = endpoints
            .iter_mut()
            .find(|ep| ep.matches(&linked.namespace_name, &linked.endpoint_name))
        {
            let profile = linked.app_armor_profile.as_str();
            if !endpoint.link(&linked.container_id, profile) {
                if let Some(previous) = previous_profile.as_deref() {
                    endpoint.swap_profile(previous, profile);
                }
            }
        }

        outcome
    }

    /// Removes a container and unlinks it from its endpoint.
    ///
    /// Returns the removed record, or `None` if the id was not registered.
    pub fn evict(&self, container_id: &ContainerID) -> Option<Container> {
        let container = lock(&self.containers).remove(container_id)?;

        let mut endpoints = lock(&self.endpoints);
        if let Some(endpoint) = endpoints
            .iter_mut()
            .find(|ep| ep.matches(&container.namespace_name, &container.endpoint_name))
        {
            endpoint.unlink(&container.container_id, &container.app_armor_profile);
        }

        Some(container)
    }

    /// Applies `update` to a registered container under the container lock.
    ///
    /// Intended for policy logic setting labels and flags. Returns `false` if
    /// the id is not registered.
    pub fn update_container(
        &self,
        container_id: &ContainerID,
        update: impl FnOnce(&mut Container),
    ) -> bool {
        match lock(&self.containers).get_mut(container_id) {
            Some(container) => {
                update(container);
                true
            }
            None => false,
        }
    }

    /// Adds an endpoint, or replaces the labels of a known one.
    ///
    /// Membership of a known endpoint is kept. Containers registered before
    /// their pod was known are linked to it.
    ///
    /// The endpoint is published before the containers are scanned, so an
    /// `upsert` racing with this call either is seen by the scan or finds the
    /// endpoint itself. Members linked from the scan that were evicted in the
    /// meantime are pruned afterwards. Only an id that is evicted and
    /// registered again while this call runs can end up unlinked.
    pub fn insert_endpoint(&self, endpoint: Endpoint) {
        let namespace_name = endpoint.namespace_name.clone();
        let endpoint_name = endpoint.endpoint_name.clone();

        {
            let mut endpoints = lock(&self.endpoints);
            match endpoints
                .iter_mut()
                .find(|ep| ep.matches(&namespace_name, &endpoint_name))
            {
                Some(existing) => existing.labels = endpoint.labels,
                None => endpoints.push(endpoint),
            }
        }

        let members: Vec<(ContainerID, String)> = lock(&self.containers)
            .values()
            .filter(|c| c.is_owned_by(&namespace_name, &endpoint_name))
            .map(|c| (c.container_id.clone(), c.app_armor_profile.clone()))
            .collect();
        if members.is_empty() {
            return;
        }
        self.with_endpoint(&namespace_name, &endpoint_name, |ep| {
            for (container_id, profile) in &members {
                ep.link(container_id, profile);
            }
        });

        let vanished: Vec<&(ContainerID, String)> = {
            let containers = lock(&self.containers);
            members
                .iter()
                .filter(|(container_id, _)| !containers.contains_key(container_id))
                .collect()
        };
        if vanished.is_empty() {
            return;
        }
        self.with_endpoint(&namespace_name, &endpoint_name, |ep| {
            for (container_id, profile) in vanished {
                ep.unlink(container_id, profile);
            }
        });
    }

    fn with_endpoint(
        &self,
        namespace_name: &str,
        endpoint_name: &str,
        update: impl FnOnce(&mut Endpoint),
    ) {
        let mut endpoints = lock(&self.endpoints);
        if let Some(endpoint) = endpoints
            .iter_mut()
            .find(|ep| ep.matches(namespace_name, endpoint_name))
        {
            update(endpoint);
        }
    }

    pub fn remove_endpoint(&self, namespace_name: &str, endpoint_name: &str) -> Option<Endpoint> {
        let mut endpoints = lock(&self.endpoints);
        let idx = endpoints
            .iter()
            .position(|ep| ep.matches(namespace_name, endpoint_name))?;
        Some(endpoints.remove(idx))
    }

    pub fn container(&self, container_id: &ContainerID) -> Option<Container> {
        lock(&self.containers).get(container_id).cloned()
    }

    /// Snapshot of all registered containers, ordered by id.
    pub fn containers(&self) -> Vec<Container> {
        let mut out: Vec<Container> = lock(&self.containers).values().cloned().collect();
        out.sort_by(|a, b| a.container_id.cmp(&b.container_id));
        out
    }

    pub fn endpoint(&self, namespace_name: &str, endpoint_name: &str) -> Option<Endpoint> {
        lock(&self.endpoints)
            .iter()
            .find(|ep| ep.matches(namespace_name, endpoint_name))
            .cloned()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        lock(&self.endpoints).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.containers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
