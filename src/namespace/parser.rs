//! Parser for the targets of `/proc/[pid]/ns/*` links.
//!
//! The kernel renders every namespace handle as `<kind>:[<inode>]`, e.g.
//! `pid:[4026531836]`. See
//! [`namespaces(7)`](https://man7.org/linux/man-pages/man7/namespaces.7.html).

use std::num::ParseIntError;

use super::NamespaceKind;

/// Errors that may occur when parsing a namespace link target.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("expected `{expected}` namespace, found `{link}`")]
    UnexpectedKind {
        expected: NamespaceKind,
        link: String,
    },

    #[error("missing `[<inode>]` in `{0}`")]
    MissingInode(String),

    #[error("invalid inode in `{link}`: {source}")]
    InvalidInode {
        link: String,
        #[source]
        source: ParseIntError,
    },
}

/// Parses the inode number out of a namespace link target of the given kind.
///
/// Trailing whitespace is ignored.
///
/// # Errors
///
/// Returns [`ParseError`] if the prefix does not name `kind`, the brackets are
/// missing or the inode is not a decimal `u32`.
pub fn parse_namespace_link(kind: NamespaceKind, link: &str) -> Result<u32, ParseError> {
    let trimmed = link.trim_end();
    let rest = trimmed
        .strip_prefix(kind.as_str())
        .and_then(|rest| rest.strip_prefix(':'))
        .ok_or_else(|| ParseError::UnexpectedKind {
            expected: kind,
            link: link.to_owned(),
        })?;

    let digits = rest
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ParseError::MissingInode(link.to_owned()))?;

    digits
        .parse::<u32>()
        .map_err(|source| ParseError::InvalidInode {
            link: link.to_owned(),
            source,
        })
}
