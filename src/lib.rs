//! Layer Timeline: reconstructs how long containerd took to prepare the layers of every
//! image a container is created from.
//!
//! The library subscribes to the containerd events service, correlates snapshot
//! preparation starts and commits, and walks the parent chain of each new container's
//! rootfs snapshot to report a chronological, per-layer latency timeline.
use tokio::signal::unix::{SignalKind, signal};

use correlation::Correlator;
use report::LogReporter;

pub mod config;
pub mod correlation;
pub mod error;
pub mod grpc;
pub mod ingest;
pub mod report;

/// Generated bindings for the containerd events API.
pub mod containerd {
    pub mod types {
        tonic::include_proto!("containerd.types");
    }
    pub mod events {
        tonic::include_proto!("containerd.events");
    }
    pub mod services {
        pub mod events {
            pub mod v1 {
                tonic::include_proto!("containerd.services.events.v1");
            }
        }
    }
}

// containerd unpacks an image layer by layer:
//  prepare(key="extract-<n> <chainid>", parent=<parent chainid>) -> commit(key, name=<chainid>)
// and then prepares the container rootfs with key=<container id>, parent=<top chainid>,
// which is never committed. `/containers/create` carries the container id and image, so
// the rootfs preparation is the entry point into the chain of committed layers.

/// Runs the correlator until SIGINT/SIGTERM or a fatal ingest error.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration values in the environment.
/// - Failure to install the signal handlers.
/// - Failure to connect to the containerd socket or to subscribe to its events.
/// - Transport errors on, or closing of, the event stream.
pub async fn run() -> error::Result<()> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {config:?}");

    let mut terminate = signal(SignalKind::terminate()).map_err(error::Error::Signal)?;
    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    };

    let channel = grpc::channel_for_unix_socket(&config.socket_path, config.connect_timeout).await?;
    let mut events = ingest::subscribe(channel, &config.namespace).await?;

    let mut correlator = Correlator::new(LogReporter, config.retention_policy());
    ingest::consume(
        &mut events,
        &mut correlator,
        config.sweep_interval,
        shutdown,
    )
    .await?;

    Ok(())
}
