pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("`clients` must be a positive integer")]
    InvalidClients,

    #[error("`rate` must be a positive number of transactions per second")]
    InvalidRate,

    #[error("`duration` must be a positive number of seconds")]
    InvalidDuration,
}
