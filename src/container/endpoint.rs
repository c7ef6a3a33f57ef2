use std::collections::BTreeMap;

use super::ContainerID;

/// A Kubernetes pod: the unit policies are attached to.
///
/// Member containers are kept in insertion order without duplicates. Profiles
/// are reference counted per member container, so a profile shared by several
/// containers stays listed until the last of them leaves the pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub namespace_name: String,
    pub endpoint_name: String,
    pub labels: BTreeMap<String, String>,
    containers: Vec<ContainerID>,
    app_armor_profiles: BTreeMap<String, usize>,
}

impl Endpoint {
    pub fn new(namespace_name: impl Into<String>, endpoint_name: impl Into<String>) -> Self {
        Self {
            namespace_name: namespace_name.into(),
            endpoint_name: endpoint_name.into(),
            labels: BTreeMap::default(),
            containers: Vec::default(),
            app_armor_profiles: BTreeMap::default(),
        }
    }

    pub fn matches(&self, namespace_name: &str, endpoint_name: &str) -> bool {
        self.namespace_name == namespace_name && self.endpoint_name == endpoint_name
    }

    pub fn containers(&self) -> &[ContainerID] {
        &self.containers
    }

    pub fn contains(&self, container_id: &ContainerID) -> bool {
        self.containers.contains(container_id)
    }

    /// Distinct profiles currently used by member containers.
    pub fn app_armor_profiles(&self) -> impl Iterator<Item = &str> {
        self.app_armor_profiles.keys().map(String::as_str)
    }

    /// Number of member containers using `profile`.
    pub fn profile_users(&self, profile: &str) -> usize {
        self.app_armor_profiles.get(profile).copied().unwrap_or(0)
    }

    /// Adds a member container together with the profile it runs under.
    ///
    /// Returns `false` without touching the profile counts if the container is
    /// already a member. An empty profile (unconfined) is not recorded.
    pub fn link(&mut self, container_id: &ContainerID, profile: &str) -> bool {
        if self.contains(container_id) {
            return false;
        }
        self.containers.push(container_id.clone());
        if !profile.is_empty() {
            *self
                .app_armor_profiles
                .entry(profile.to_owned())
                .or_default() += 1;
        }
        true
    }

    /// Removes a member container and releases its hold on `profile`.
    ///
    /// Returns `false` if the container was not a member.
    pub fn unlink(&mut self, container_id: &ContainerID, profile: &str) -> bool {
        let Some(idx) = self.containers.iter().position(|id| id == container_id) else {
            return false;
        };
        self.containers.remove(idx);
        self.release_profile(profile);
        true
    }

    /// Moves one member's hold from profile `old` to profile `new`.
    pub fn swap_profile(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        self.release_profile(old);
        if !new.is_empty() {
            *self.app_armor_profiles.entry(new.to_owned()).or_default() += 1;
        }
    }

    fn release_profile(&mut self, profile: &str) {
        if let Some(count) = self.app_armor_profiles.get_mut(profile) {
            *count -= 1;
            if *count == 0 {
                self.app_armor_profiles.remove(profile);
            }
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
    fn test_link_is_idempotent() {
        let mut ep = Endpoint::new("default", "web");
        assert!(ep.link(&id("c1"), "profile-a"));
        assert!(!ep.link(&id("c1"), "profile-a"));

        assert_eq!(ep.containers(), &[id("c1")]);
        assert_eq!(ep.profile_users("profile-a"), 1);
    }

    #[test]
    fn test_shared_profile_survives_sibling_removal() {
        let mut ep = Endpoint::new("default", "web");
        ep.link(&id("c1"), "shared");
        ep.link(&id("c2"), "shared");

        assert!(ep.unlink(&id("c1"), "shared"));
        assert_eq!(ep.app_armor_profiles().collect::<Vec<_>>(), vec!["shared"]);

        assert!(ep.unlink(&id("c2"), "shared"));
        assert_eq!(ep.app_armor_profiles().count(), 0);
        assert!(ep.containers().is_empty());
    }

    #[test]
    fn test_unlink_unknown_container_keeps_profiles() {
        let mut ep = Endpoint::new("default", "web");
        ep.link(&id("c1"), "profile-a");

        assert!(!ep.unlink(&id("c2"), "profile-a"));
        assert_eq!(ep.profile_users("profile-a"), 1);
    }

    #[test]
    fn test_swap_profile_moves_single_hold() {
        let mut ep = Endpoint::new("default", "web");
        ep.link(&id("c1"), "old");
        ep.link(&id("c2"), "old");

        ep.swap_profile("old", "new");
        assert_eq!(ep.profile_users("old"), 1);
        assert_eq!(ep.profile_users("new"), 1);
    }

    #[test]
    fn test_empty_profile_is_not_recorded() {
        let mut ep = Endpoint::new("default", "web");
        ep.link(&id("c1"), "");
        assert_eq!(ep.app_armor_profiles().count(), 0);
        assert!(ep.unlink(&id("c1"), ""));
    }
}
