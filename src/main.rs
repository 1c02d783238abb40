/// Entry point for the layer timeline correlator.
///
/// Connects to containerd, observes snapshot and container events and logs, for every
/// created container, how long each layer of its image took to prepare.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, containerd cannot be reached, or the
/// event stream fails.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info CONTAINERD_SOCKET=/run/containerd/containerd.sock cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    layer_timeline::run().await?;
    Ok(())
}
