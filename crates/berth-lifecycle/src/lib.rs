pub mod error;
pub mod manager;
pub mod status;

pub use error::{LifecycleError, LifecycleResult};
pub use manager::{
    AddOutcome, AddRequest, Lifecycle, RemovalConfirmation, RestartOutcome, UpgradeOutcome,
};
pub use status::{ProxyStatus, ServiceStatus, StatusReport};
