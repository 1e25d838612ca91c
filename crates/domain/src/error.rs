use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid output ID: {0}")]
    InvalidOutputId(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Output not set up: {0}")]
    NotSetUp(String),

    #[error("Output not found: {0}")]
    OutputNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
