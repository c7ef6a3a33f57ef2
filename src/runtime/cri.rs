use std::collections::HashSet;
use std::path::PathBuf;

use tonic::transport::Channel;

use crate::container::ContainerID;
use crate::cri::v1::runtime_service_client::RuntimeServiceClient;
use crate::cri::v1::{ContainerStatusRequest, ContainerStatusResponse, ListContainersRequest};

use super::info::{INFO_KEY, parse_info};
use super::{ContainerDetails, ContainerRuntime, Error, Result};

/// Client for CRI-O's `RuntimeService` over its local Unix socket.
#[derive(Debug, Clone)]
pub struct CriClient {
    socket_path: PathBuf,
    client: RuntimeServiceClient<Channel>,
}

impl CriClient {
    /// Connects to the runtime socket at `socket_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SocketConnect`] if the socket is absent or refuses the
    /// connection, i.e. CRI-O is not running on this host.
    pub async fn connect(socket_path: impl Into<PathBuf>) -> Result<Self> {
        let socket_path = socket_path.into();
        let channel = crate::grpc::channel_for_unix_socket(&socket_path)
            .await
            .map_err(|source| Error::SocketConnect {
                path: socket_path.clone(),
                source,
            })?;

        Ok(Self {
            socket_path,
            client: RuntimeServiceClient::new(channel),
        })
    }

    /// Releases the connection.
    pub fn close(self) {
        log::debug!("Closing connection to {}", self.socket_path.display());
    }
}

impl ContainerRuntime for CriClient {
    async fn list_container_ids(&mut self) -> Result<HashSet<ContainerID>> {
        let containers = self
            .client
            .list_containers(ListContainersRequest { filter: None })
            .await
            .map_err(|err| Error::ListContainers(Box::new(err)))?
            .into_inner()
            .containers;

        let mut ids = HashSet::with_capacity(containers.len());
        for container in containers {
            match ContainerID::new(&container.id) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(err) => log::warn!("Skipping container reported by runtime: {err}"),
            }
        }
        log::trace!("Found {} containers", ids.len());

        Ok(ids)
    }

    async fn container_details(
        &mut self,
        container_id: &ContainerID,
    ) -> Result<ContainerDetails> {
        // verbose is required for CRI-O to attach the `info` payload
        let response = self
            .client
            .container_status(ContainerStatusRequest {
                container_id: container_id.to_string(),
                verbose: true,
            })
            .await
            .map_err(|err| Error::ContainerStatus {
                container_id: container_id.to_string(),
                source: Box::new(err),
            })?
            .into_inner();

        details_from_status(container_id, response)
    }
}

/// Converts a verbose `ContainerStatus` response into [`ContainerDetails`].
///
/// # Errors
///
/// * [`Error::MissingStatus`] / [`Error::MissingInfo`] if the response is incomplete.
/// * [`Error::InfoDecode`] if the `info` payload is malformed.
/// * [`Error::InvalidContainerID`] if the status carries an invalid id.
pub fn details_from_status(
    requested: &ContainerID,
    mut response: ContainerStatusResponse,
) -> Result<ContainerDetails> {
    let status = response
        .status
        .take()
        .ok_or_else(|| Error::MissingStatus(requested.to_string()))?;
    let raw_info = response
        .info
        .get(INFO_KEY)
        .ok_or_else(|| Error::MissingInfo(requested.to_string()))?;
    let info = parse_info(requested.as_ref(), raw_info)?;

    Ok(ContainerDetails {
        container_id: ContainerID::new(&status.id)?,
        name: status.metadata.map(|m| m.name).unwrap_or_default(),
        image: status.image.map(|i| i.image).unwrap_or_default(),
        labels: status.labels,
        sandbox_id: info.sandbox_id.clone(),
        pid: info.pid,
        apparmor_profile: info.apparmor_profile().to_owned(),
        rootfs: info.rootfs().to_owned(),
        privileged: info.privileged,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::cri::v1::{ContainerMetadata, ContainerStatus, ImageSpec};

    fn response(id: &str, info: Option<&str>) -> ContainerStatusResponse {
        ContainerStatusResponse {
            status: Some(ContainerStatus {
                id: id.to_owned(),
                metadata: Some(ContainerMetadata {
                    name: "nginx".to_owned(),
                    attempt: 0,
                }),
                image: Some(ImageSpec {
                    image: "docker.io/library/nginx:1.27".to_owned(),
                    annotations: HashMap::default(),
                }),
                labels: HashMap::from([
                    ("io.kubernetes.pod.namespace".to_owned(), "default".to_owned()),
                    ("io.kubernetes.pod.name".to_owned(), "web".to_owned()),
                ]),
                ..Default::default()
            }),
            info: info
                .map(|raw| HashMap::from([(INFO_KEY.to_owned(), raw.to_owned())]))
                .unwrap_or_default(),
        }
    }

    #[test]
    fn test_details_from_status() {
        let requested = ContainerID::new("c1").unwrap();
        let info = r#"{"sandboxID":"sb1","pid":77,"runtimeSpec":{"process":{"apparmorProfile":"p1"},"root":{"path":"/merged"}}}"#;

        let details = details_from_status(&requested, response("c1", Some(info))).unwrap();
        assert_eq!(details.container_id, requested);
        assert_eq!(details.name, "nginx");
        assert_eq!(details.image, "docker.io/library/nginx:1.27");
        assert_eq!(details.pid, 77);
        assert_eq!(details.sandbox_id, "sb1");
        assert_eq!(details.apparmor_profile, "p1");
        assert_eq!(details.rootfs, "/merged");
        assert_eq!(details.pod_namespace(), "default");
        assert_eq!(details.pod_name(), "web");
    }

    #[test]
    fn test_missing_info_is_distinct_error() {
        let requested = ContainerID::new("c1").unwrap();
        let err = details_from_status(&requested, response("c1", None)).unwrap_err();
        assert!(matches!(err, Error::MissingInfo(_)));
    }

    #[test]
    fn test_malformed_info_is_decode_error() {
        let requested = ContainerID::new("c1").unwrap();
        let err = details_from_status(&requested, response("c1", Some("{"))).unwrap_err();
        assert!(matches!(err, Error::InfoDecode { .. }));
    }

    #[test]
    fn test_missing_status_and_empty_id() {
        let requested = ContainerID::new("c1").unwrap();
        let empty = ContainerStatusResponse::default();
        assert!(matches!(
            details_from_status(&requested, empty).unwrap_err(),
            Error::MissingStatus(_)
        ));

        let err = details_from_status(&requested, response("", Some("{}"))).unwrap_err();
        assert!(matches!(err, Error::InvalidContainerID(_)));
    }

    #[tokio::test]
    async fn test_connect_without_runtime_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = CriClient::connect(dir.path().join("crio.sock"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SocketConnect { .. }));
    }
}
