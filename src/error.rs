use thiserror::Error;

/// Errors surfaced by the adapter.
///
/// Driver-level failures are forwarded verbatim as the error payload,
/// undecorated; the remaining variants describe adapter-side failures.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Driver(#[from] tiberius::error::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}
