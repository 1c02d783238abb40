/// Fatal errors that stop the correlator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] crate::config::Error),
    #[error(transparent)]
    Connect(#[from] crate::grpc::Error),
    #[error(transparent)]
    Ingest(#[from] crate::ingest::Error),
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
