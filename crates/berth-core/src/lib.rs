pub mod config;
pub mod env;
pub mod paths;
pub mod types;
pub mod validate;

pub use config::BerthConfig;
pub use env::{EnvSet, merge};
pub use paths::ConfigRoot;
pub use types::*;
pub use validate::{ValidationError, validate_hostname, validate_service_name};
