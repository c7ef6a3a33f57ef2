/// Entry point for the CRI-O container visibility engine.
///
/// Tracks the containers CRI-O runs on this host, links them to their
/// Kubernetes pods and hands their kernel namespace ids to event attribution.
/// Configuration is read from the environment, see [`crio_monitor::config`].
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info CRIO_SOCKET_PATH=/var/run/crio/crio.sock cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    crio_monitor::run().await
}
