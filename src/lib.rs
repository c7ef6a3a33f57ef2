//! Crio Monitor: the container visibility layer of a node security agent.
//!
//! Polls the CRI-O runtime for running containers, keeps a shared registry of
//! containers and the pods (endpoints) owning them, and resolves the kernel
//! namespaces needed to attribute low-level events to a container.
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use error::ResultOkLogExt;

pub mod api;
pub mod attribution;
pub mod config;
pub mod container;
pub mod diff;
pub mod discovery;
pub mod error;
pub mod fsutil;
pub mod grpc;
pub mod namespace;
pub mod registry;
pub mod runtime;

// Discovery flow:
//  every cycle: ListContainers -> diff against tracked ids
//  added:   ContainerStatus(verbose) -> `info` json -> pid -> /proc/<pid>/ns/{pid,mnt}
//           -> registry upsert -> endpoint linkage -> NsMap register
//  removed: registry evict -> endpoint unlinkage -> NsMap unregister

pub mod cri {
    pub mod v1 {
        tonic::include_proto!("runtime.v1");
    }
}

/// Runs the engine until Ctrl-C.
///
/// Starts CRI-O discovery and, if configured, the read-side API. A host
/// without CRI-O keeps serving the (empty) registry.
///
/// # Errors
///
/// Returns an error if the configuration in the environment is invalid.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {config:?}");

    let registry = Arc::new(registry::Registry::default());
    let ns_map = Arc::new(attribution::NsMap::default());
    let token = CancellationToken::new();

    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c()
                .await
                .ok_log("failed to listen for shutdown signal")
                .is_some()
            {
                log::info!("Shutting down");
                token.cancel();
            }
        });
    }

    let api = config.api_addr.clone().map(|addr| {
        let server = api::APIServer::new(Arc::clone(&registry));
        let token = token.clone();
        tokio::spawn(async move {
            server
                .listen(addr, token)
                .await
                .ok_log("API server failed");
        })
    });

    let discovery = discovery::crio::start(
        &config,
        Arc::clone(&registry),
        Some(Arc::clone(&ns_map)),
        token.clone(),
    )
    .await;

    token.cancelled().await;

    if let Some(handle) = discovery {
        handle.await.ok_log("container discovery task failed");
    }
    if let Some(handle) = api {
        handle.await.ok_log("API task failed");
    }
    log::debug!(
        "Exiting with {} containers and {} namespace mappings",
        registry.len(),
        ns_map.size()
    );

    Ok(())
}
