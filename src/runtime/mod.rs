//! Container runtime access.
//!
//! [`ContainerRuntime`] is what the discovery loop needs from a runtime:
//! the set of live container ids and per-container details. [`CriClient`]
//! implements it against CRI-O's gRPC API. Other CRI runtimes differ only in
//! the shape of the verbose `info` payload.
mod cri;
mod error;
pub mod info;

use std::collections::{HashMap, HashSet};

use crate::container::{Container, ContainerID, NamespaceIds, UNKNOWN};

pub use cri::{CriClient, details_from_status};
pub use error::{Error, Result};

/// Label carrying the Kubernetes namespace of the owning pod.
pub const POD_NAMESPACE_LABEL: &str = "io.kubernetes.pod.namespace";
/// Label carrying the name of the owning pod.
pub const POD_NAME_LABEL: &str = "io.kubernetes.pod.name";

/// Everything discovery learns about a container from the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerDetails {
    pub container_id: ContainerID,
    pub name: String,
    pub image: String,
    pub labels: HashMap<String, String>,
    pub sandbox_id: String,
    pub pid: u32,
    pub apparmor_profile: String,
    pub rootfs: String,
    pub privileged: bool,
}

impl ContainerDetails {
    /// Kubernetes namespace of the owning pod, or [`UNKNOWN`].
    pub fn pod_namespace(&self) -> &str {
        self.labels
            .get(POD_NAMESPACE_LABEL)
            .map_or(UNKNOWN, String::as_str)
    }

    /// Name of the owning pod, or [`UNKNOWN`].
    pub fn pod_name(&self) -> &str {
        self.labels.get(POD_NAME_LABEL).map_or(UNKNOWN, String::as_str)
    }

    /// Builds the registry record for this container.
    ///
    /// Runtime labels only determine ownership; the record's own labels are
    /// left to policy logic.
    pub fn into_container(self, namespaces: NamespaceIds) -> Container {
        let mut container = Container::new(self.container_id.clone());
        container.namespace_name = self.pod_namespace().to_owned();
        container.endpoint_name = self.pod_name().to_owned();
        container.container_name = self.name;
        container.container_image = self.image;
        container.sandbox_id = self.sandbox_id;
        container.app_armor_profile = self.apparmor_profile;
        container.merged_dir = self.rootfs;
        container.privileged = self.privileged;
        container.set_namespaces(namespaces);
        container
    }
}

/// The runtime operations used by discovery.
///
/// Errors are returned as they come from the runtime; retrying is left to
/// the caller's next poll.
pub trait ContainerRuntime {
    /// Ids of every container the runtime currently knows about.
    fn list_container_ids(
        &mut self,
    ) -> impl std::future::Future<Output = Result<HashSet<ContainerID>>> + Send;

    /// Status and runtime-specific details of one container.
    fn container_details(
        &mut self,
        container_id: &ContainerID,
    ) -> impl std::future::Future<Output = Result<ContainerDetails>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(labels: &[(&str, &str)]) -> ContainerDetails {
        ContainerDetails {
            container_id: ContainerID::new("c1").unwrap(),
            name: "nginx".to_owned(),
            image: "docker.io/library/nginx:1.27".to_owned(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            sandbox_id: "sb1".to_owned(),
            pid: 4242,
            apparmor_profile: "crio-default".to_owned(),
            rootfs: "/merged".to_owned(),
            privileged: true,
        }
    }

    #[test]
    fn test_pod_ownership_from_labels() {
        let d = details(&[
            (POD_NAMESPACE_LABEL, "kube-system"),
            (POD_NAME_LABEL, "coredns-abc"),
        ]);
        assert_eq!(d.pod_namespace(), "kube-system");
        assert_eq!(d.pod_name(), "coredns-abc");
    }

    #[test]
    fn test_missing_labels_yield_unknown() {
        let d = details(&[(POD_NAME_LABEL, "coredns-abc")]);
        assert_eq!(d.pod_namespace(), UNKNOWN);
        assert_eq!(d.pod_name(), "coredns-abc");
    }

    #[test]
    fn test_into_container_copies_runtime_fields() {
        let d = details(&[(POD_NAMESPACE_LABEL, "default"), (POD_NAME_LABEL, "web")]);
        let c = d.into_container(NamespaceIds::new(1, 2));

        assert_eq!(c.container_name, "nginx");
        assert_eq!(c.container_image, "docker.io/library/nginx:1.27");
        assert!(c.is_owned_by("default", "web"));
        assert_eq!(c.app_armor_profile, "crio-default");
        assert_eq!(c.merged_dir, "/merged");
        assert!(c.privileged);
        assert_eq!(c.namespaces(), NamespaceIds::new(1, 2));
        assert!(c.labels.is_empty());
        assert!(!c.policy_enabled);
    }
}
