use crate::fsutil;

use super::NamespaceKind;
use super::parser::ParseError;

/// Errors that may occur while resolving the namespaces of a process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The namespace handle could not be read, usually because the process exited.
    #[error(transparent)]
    ReadLink(#[from] fsutil::ReadLinkError),
    /// The namespace handle was read but does not have the `<kind>:[<inode>]` form.
    #[error("failed to parse {kind} namespace of pid {pid}: {source}")]
    Parse {
        pid: u32,
        kind: NamespaceKind,
        #[source]
        source: ParseError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
