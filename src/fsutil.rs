use std::io;
use std::path::{Path, PathBuf};

/// Error that occurs when reading a symbolic link fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to read symlink `{path}`: {source}")]
pub struct ReadLinkError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Reads the target of the symbolic link at `path` as text.
///
/// Non UTF-8 bytes in the target are replaced, which is harmless for the
/// kernel-generated links this is used on (e.g. `/proc/<pid>/ns/*`).
///
/// # Errors
///
/// Returns a [`ReadLinkError`] if `path` does not exist or is not a symlink.
///
/// # Example
/// ```no_run
/// # use crio_monitor::fsutil;
/// let target = fsutil::read_link_string("/proc/self/ns/pid")?;
/// assert!(target.starts_with("pid:["));
/// # Ok::<(), fsutil::ReadLinkError>(())
/// ```
pub fn read_link_string(path: impl AsRef<Path>) -> Result<String, ReadLinkError> {
    let path = path.as_ref();
    let target = std::fs::read_link(path).map_err(|source| ReadLinkError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(target.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_link_string_success() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let link = dir.path().join("pid");
        std::os::unix::fs::symlink("pid:[4026531836]", &link).unwrap();

        let target = read_link_string(&link).expect("should read test link");
        assert_eq!(target, "pid:[4026531836]");
    }

    #[test]
    fn test_read_link_string_error() {
        let result = read_link_string("/definitely/does/not/exist");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.path, PathBuf::from("/definitely/does/not/exist"));
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_link_string_on_regular_file() {
        let tmp = tempfile::NamedTempFile::new().expect("failed to create temp file");
        let err = read_link_string(tmp.path()).unwrap_err();
        assert_eq!(err.source.kind(), std::io::ErrorKind::InvalidInput);
    }
}
