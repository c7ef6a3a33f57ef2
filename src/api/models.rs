use std::collections::BTreeMap;

use crate::container::{ContainerID, Endpoint};

/// JSON view of an [`Endpoint`].
#[derive(Debug, serde::Serialize)]
pub struct EndpointView {
    pub namespace_name: String,
    pub endpoint_name: String,
    pub labels: BTreeMap<String, String>,
    pub containers: Vec<ContainerID>,
    pub app_armor_profiles: Vec<String>,
}

impl From<Endpoint> for EndpointView {
    fn from(endpoint: Endpoint) -> Self {
        Self {
            containers: endpoint.containers().to_vec(),
            app_armor_profiles: endpoint.app_armor_profiles().map(str::to_owned).collect(),
            namespace_name: endpoint.namespace_name,
            endpoint_name: endpoint.endpoint_name,
            labels: endpoint.labels,
        }
    }
}
