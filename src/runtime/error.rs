use std::path::PathBuf;

use crate::container;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to socket `{path}`: {source}")]
    SocketConnect {
        path: PathBuf,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("failed to list containers: {0}")]
    ListContainers(#[source] Box<tonic::Status>),
    #[error("failed to get status of container `{container_id}`: {source}")]
    ContainerStatus {
        container_id: String,
        #[source]
        source: Box<tonic::Status>,
    },
    #[error("container status response for `{0}` carries no status")]
    MissingStatus(String),
    #[error("container status response for `{0}` carries no `info` payload")]
    MissingInfo(String),
    #[error("failed to decode `info` payload of container `{container_id}`: {source}")]
    InfoDecode {
        container_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    InvalidContainerID(#[from] container::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
