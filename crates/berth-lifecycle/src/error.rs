//! Lifecycle error taxonomy.
//!
//! Every variant's message names a concrete next step; workflows are
//! ordered so that a failure never leaves partially-applied state.

use thiserror::Error;

use berth_core::validate::ValidationError;
use berth_registry::RegistryError;
use berth_runtime::RuntimeError;
use berth_secrets::SecretError;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a service named '{0}' already exists — pick another name, or remove it first")]
    DuplicateName(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("the secret store rejected the token — verify it grants read access and retry")]
    Auth,

    #[error("{0} — the secret store may be down; retry once it is reachable")]
    SecretStore(SecretError),

    #[error("merged environment is missing required key '{0}' — add it to the service's secret config and retry")]
    RequiredFieldMissing(String),

    #[error("PORT value '{0}' is not a usable TCP port — fix it in the secret config and retry")]
    InvalidPort(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("removal not confirmed: the typed name must match the service name exactly — nothing was changed")]
    ConfirmationRejected,
}

impl From<SecretError> for LifecycleError {
    fn from(e: SecretError) -> Self {
        if e.is_auth() {
            LifecycleError::Auth
        } else {
            LifecycleError::SecretStore(e)
        }
    }
}
