//! Kernel namespace resolution for container processes.
//!
//! Bridges a container's user-space identity (its init pid) to the PID and
//! mount namespace inode numbers the kernel reports in low-level events.
//! Handles are read from `<proc_root>/<pid>/ns/{pid,mnt}`, so the agent can
//! run inside a container with the host's `/proc` mounted elsewhere.
mod error;
mod parser;

use std::fmt;
use std::path::PathBuf;

use crate::container::NamespaceIds;
use crate::fsutil;

pub use error::{Error, Result};
pub use parser::{ParseError, parse_namespace_link};

/// The namespace kinds tracked per container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceKind {
    Pid,
    Mnt,
}

impl NamespaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamespaceKind::Pid => "pid",
            NamespaceKind::Mnt => "mnt",
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves namespace identifiers of processes through a procfs mount.
#[derive(Debug, Clone)]
pub struct NamespaceExtractor {
    proc_root: PathBuf,
}

impl Default for NamespaceExtractor {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl NamespaceExtractor {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Reads a single namespace inode of `pid`.
    ///
    /// # Errors
    ///
    /// * [`Error::ReadLink`] if the handle cannot be read (e.g. the process exited).
    /// * [`Error::Parse`] if the handle is not of the form `<kind>:[<inode>]`.
    pub fn read_namespace(&self, pid: u32, kind: NamespaceKind) -> Result<u32> {
        let path = self
            .proc_root
            .join(pid.to_string())
            .join("ns")
            .join(kind.as_str());
        let link = fsutil::read_link_string(&path)?;

        parse_namespace_link(kind, &link).map_err(|source| Error::Parse { pid, kind, source })
    }

    /// Resolves the PID and mount namespaces of `pid`.
    ///
    /// A malformed handle leaves the corresponding id at `0`, so the rest of
    /// the container record can still be registered. Callers retrying a
    /// container decide how loudly to report it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadLink`] if either handle cannot be read.
    pub fn resolve(&self, pid: u32) -> Result<NamespaceIds> {
        let pid_ns = self.read_or_zero(pid, NamespaceKind::Pid)?;
        let mnt_ns = self.read_or_zero(pid, NamespaceKind::Mnt)?;

        Ok(NamespaceIds::new(pid_ns, mnt_ns))
    }

    fn read_or_zero(&self, pid: u32, kind: NamespaceKind) -> Result<u32> {
        match self.read_namespace(pid, kind) {
            Ok(inode) => Ok(inode),
            Err(err @ Error::Parse { .. }) => {
                log::debug!("Unable to get {kind} namespace (pid={pid}): {err}");
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }
}
