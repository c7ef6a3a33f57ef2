//! Decoding of the CRI-O specific `info` payload returned by a verbose
//! `ContainerStatus` call.
//!
//! Only the fields needed for discovery are modelled; everything else in the
//! embedded OCI runtime spec is ignored.
use serde::Deserialize;

use super::{Error, Result};

/// Key of the JSON document inside `ContainerStatusResponse.info`.
pub const INFO_KEY: &str = "info";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrioContainerInfo {
    #[serde(rename = "sandboxID", default)]
    pub sandbox_id: String,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub runtime_spec: RuntimeSpec,
    #[serde(default)]
    pub privileged: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RuntimeSpec {
    #[serde(default)]
    pub process: Option<SpecProcess>,
    #[serde(default)]
    pub root: Option<SpecRoot>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpecProcess {
    #[serde(rename = "apparmorProfile", default)]
    pub apparmor_profile: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpecRoot {
    #[serde(default)]
    pub path: String,
}

impl CrioContainerInfo {
    pub fn apparmor_profile(&self) -> &str {
        self.runtime_spec
            .process
            .as_ref()
            .map_or("", |p| p.apparmor_profile.as_str())
    }

    pub fn rootfs(&self) -> &str {
        self.runtime_spec
            .root
            .as_ref()
            .map_or("", |r| r.path.as_str())
    }
}

/// Decodes the `info` JSON document of container `container_id`.
///
/// # Errors
///
/// Returns [`Error::InfoDecode`] if `raw` is not a valid payload.
pub fn parse_info(container_id: &str, raw: &str) -> Result<CrioContainerInfo> {
    serde_json::from_str(raw).map_err(|source| Error::InfoDecode {
        container_id: container_id.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "sandboxID": "9f2c4d1e",
        "pid": 4242,
        "privileged": false,
        "runtimeSpec": {
            "ociVersion": "1.0.2-dev",
            "process": {
                "user": {"uid": 0, "gid": 0},
                "args": ["nginx", "-g", "daemon off;"],
                "apparmorProfile": "crio-default"
            },
            "root": {"path": "/var/lib/containers/storage/overlay/abc/merged"}
        }
    }"#;

    #[test]
    fn test_parse_info_extracts_discovery_fields() {
        let info = parse_info("c1", SAMPLE).unwrap();
        assert_eq!(info.sandbox_id, "9f2c4d1e");
        assert_eq!(info.pid, 4242);
        assert!(!info.privileged);
        assert_eq!(info.apparmor_profile(), "crio-default");
        assert_eq!(info.rootfs(), "/var/lib/containers/storage/overlay/abc/merged");
    }

    #[test]
    fn test_parse_info_tolerates_missing_spec_sections() {
        let info = parse_info("c1", r#"{"pid": 1, "runtimeSpec": {}}"#).unwrap();
        assert_eq!(info.apparmor_profile(), "");
        assert_eq!(info.rootfs(), "");
    }

    #[test]
    fn test_parse_info_rejects_garbage() {
        let err = parse_info("c1", "not json").unwrap_err();
        match err {
            Error::InfoDecode { container_id, .. } => assert_eq!(container_id, "c1"),
            other => panic!("expected InfoDecode, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_info_rejects_negative_pid() {
        assert!(parse_info("c1", r#"{"pid": -1}"#).is_err());
    }
}
