use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build client: {0}")]
    Client(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
