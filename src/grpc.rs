use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{pin, task};

use hyper_util::rt::TokioIo;
use tonic::transport::{Channel, Endpoint};

/// Error returned when no gRPC channel could be established over a unix socket.
#[derive(Debug, thiserror::Error)]
#[error("failed to connect to socket `{path}`: {source}")]
pub struct Error {
    pub path: PathBuf,
    #[source]
    pub source: tonic::transport::Error,
}

/// Dials the same unix socket for every connection attempt of a channel.
///
/// The URI handed in by tonic is a placeholder and ignored.
#[derive(Debug, Clone)]
struct UnixSocketConnector {
    path: PathBuf,
}

impl tower::Service<hyper::Uri> for UnixSocketConnector {
    type Response = TokioIo<tokio::net::UnixStream>;

    type Error = std::io::Error;

    type Future = pin::Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> task::Poll<Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, _uri: hyper::Uri) -> Self::Future {
        let path = self.path.clone();
        Box::pin(async move {
            let stream = tokio::net::UnixStream::connect(&path).await?;
            log::trace!("Opened unix stream to {}", path.display());

            Ok(TokioIo::new(stream))
        })
    }
}

/// Creates a gRPC channel to the server listening on the unix socket at `path`.
///
/// # Errors
///
/// Returns [`Error`] if the socket cannot be dialed within `connect_timeout`.
pub async fn channel_for_unix_socket(
    path: impl AsRef<Path>,
    connect_timeout: Duration,
) -> Result<Channel, Error> {
    let path = path.as_ref();
    log::debug!("Connecting to {}...", path.display());
    let connector = UnixSocketConnector {
        path: path.to_path_buf(),
    };
    let channel = Endpoint::from_static("http://[::]:50051")
        .connect_timeout(connect_timeout)
        .connect_with_connector(connector)
        .await
        .map_err(|source| Error {
            path: path.to_path_buf(),
            source,
        })?;
    log::debug!("Created channel for {}.", path.display());

    Ok(channel)
}
