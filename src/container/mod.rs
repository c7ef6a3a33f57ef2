use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

mod endpoint;
mod error;

pub use endpoint::Endpoint;
pub use error::{Error, Result};

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// Number of characters of a [`ContainerID`] shown in log lines.
const SHORT_ID_LEN: usize = 12;

/// Ownership placeholder used until the pod labels of a container are known.
pub const UNKNOWN: &str = "Unknown";

/// A validated container identifier.
///
/// # Examples
///
/// ```
/// # use crio_monitor::container::ContainerID;
/// let raw_id = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd";
/// let container_id = ContainerID::new(raw_id).unwrap();
/// assert_eq!(container_id.as_ref(), "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123abcd");
/// assert_eq!(container_id.short(), "abc123abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or its length exceeds
    /// [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// Returns the abbreviated form of the id used in log lines.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_ID_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl FromStr for ContainerID {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for ContainerID {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

/// Kernel namespace inode numbers of a container's init process.
///
/// A value of `0` means the namespace has not been resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
pub struct NamespaceIds {
    pub pid_ns: u32,
    pub mnt_ns: u32,
}

impl NamespaceIds {
    pub fn new(pid_ns: u32, mnt_ns: u32) -> Self {
        Self { pid_ns, mnt_ns }
    }

    /// Returns `true` if neither namespace has been resolved.
    pub fn is_unresolved(&self) -> bool {
        self.pid_ns == 0 && self.mnt_ns == 0
    }
}

/// One running container as tracked by the registry.
///
/// Identity, runtime metadata and kernel linkage are written by the discovery
/// loop. Labels and the policy/visibility flags belong to the policy side of
/// the agent and survive every re-merge done by discovery.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Container {
    pub container_id: ContainerID,
    pub container_name: String,
    pub container_image: String,

    pub namespace_name: String,
    pub endpoint_name: String,
    pub sandbox_id: String,

    pub app_armor_profile: String,
    pub merged_dir: String,
    pub privileged: bool,

    pub pid_ns: u32,
    pub mnt_ns: u32,

    pub labels: BTreeMap<String, String>,
    pub policy_enabled: bool,
    pub process_visibility_enabled: bool,
    pub file_visibility_enabled: bool,
    pub network_visibility_enabled: bool,
    pub capabilities_visibility_enabled: bool,
}

impl Container {
    /// Creates an empty record owned by the [`UNKNOWN`] pod.
    pub fn new(container_id: ContainerID) -> Self {
        Self {
            container_id,
            container_name: String::new(),
            container_image: String::new(),
            namespace_name: UNKNOWN.to_owned(),
            endpoint_name: UNKNOWN.to_owned(),
            sandbox_id: String::new(),
            app_armor_profile: String::new(),
            merged_dir: String::new(),
            privileged: false,
            pid_ns: 0,
            mnt_ns: 0,
            labels: BTreeMap::default(),
            policy_enabled: false,
            process_visibility_enabled: false,
            file_visibility_enabled: false,
            network_visibility_enabled: false,
            capabilities_visibility_enabled: false,
        }
    }

    pub fn namespaces(&self) -> NamespaceIds {
        NamespaceIds::new(self.pid_ns, self.mnt_ns)
    }

    pub fn set_namespaces(&mut self, ns: NamespaceIds) {
        self.pid_ns = ns.pid_ns;
        self.mnt_ns = ns.mnt_ns;
    }

    /// Returns `true` if this container belongs to the pod `namespace`/`name`.
    pub fn is_owned_by(&self, namespace: &str, name: &str) -> bool {
        self.namespace_name == namespace && self.endpoint_name == name
    }
}
