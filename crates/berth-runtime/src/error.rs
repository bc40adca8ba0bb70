//! Error types for the container runtime adapter.

use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("docker is not available on this host: {0}")]
    Unavailable(String),

    #[error("`docker {command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to parse docker output: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to render compose file: {0}")]
    Render(String),
}
