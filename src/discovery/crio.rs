use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::attribution::NamespaceAttribution;
use crate::config::Config;
use crate::namespace::NamespaceExtractor;
use crate::registry::Registry;
use crate::runtime::CriClient;

use super::Reconciler;

/// Starts monitoring CRI-O containers in a background task.
///
/// Returns `None` if the CRI-O socket cannot be connected, which means CRI-O
/// is not the runtime on this host. The task ends when `token` is cancelled
/// or CRI-O stops answering.
pub async fn start<A>(
    config: &Config,
    registry: Arc<Registry>,
    attribution: Option<Arc<A>>,
    token: CancellationToken,
) -> Option<JoinHandle<()>>
where
    A: NamespaceAttribution + 'static,
{
    let client = match CriClient::connect(&config.crio_socket).await {
        Ok(client) => client,
        Err(err) => {
            log::info!("CRI-O not available: {err}");
            return None;
        }
    };

    let reconciler = Reconciler::new(
        client,
        registry,
        NamespaceExtractor::new(config.proc_root()),
        attribution.filter(|_| config.policy_enabled),
        config.intervals,
    );

    log::info!(
        "Started to monitor CRI-O events ({})",
        config.crio_socket.display()
    );
    Some(tokio::spawn(async move {
        let client = reconciler.run(token).await;
        log::info!("Stopped monitoring CRI-O events");
        client.close();
    }))
}
