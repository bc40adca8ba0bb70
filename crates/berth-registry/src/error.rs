//! Error types for the service registry.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no service named '{0}' is registered")]
    NotFound(String),

    #[error("hostname '{0}' is already claimed by service '{1}'")]
    HostnameTaken(String, String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("another operation is already running for '{0}' — wait for it or remove the stale lock file")]
    Locked(String),
}

impl From<std::io::Error> for RegistryError {
    fn from(e: std::io::Error) -> Self {
        RegistryError::Io(e.to_string())
    }
}
