pub mod client;

pub use client::{HttpSecretStore, SecretError, SecretStore};
