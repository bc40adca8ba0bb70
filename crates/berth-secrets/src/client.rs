//! Secret store HTTP client.
//!
//! Talks to a Doppler-style secrets backend: the token rides as the
//! basic-auth username with an empty password, and the download endpoint
//! returns `KEY=VALUE` lines for `?format=env`. Success is exactly HTTP
//! 200; every other status is a failure regardless of transport outcome.
//! No retry policy lives here; callers decide based on the error kind.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// Errors from secret store calls.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The store answered with a non-200 status. 401/403 mean the token
    /// was rejected; anything else is a server-side problem.
    #[error("secret store returned HTTP {0}")]
    Status(u16),

    /// The store could not be reached at all.
    #[error("secret store unreachable: {0}")]
    Transport(String),
}

impl SecretError {
    /// True when the failure is an auth rejection rather than an outage.
    pub fn is_auth(&self) -> bool {
        matches!(self, SecretError::Status(401) | SecretError::Status(403))
    }
}

/// Narrow interface over the secret store, so workflows can be driven by
/// a stub in tests.
pub trait SecretStore {
    /// Probe the store with the token as credential. True only on an
    /// explicit success status. Auth rejections and transport failures
    /// both report false; this never panics on network trouble.
    fn validate(&self, token: &str) -> bool;

    /// Download the secret set as env-format bytes. Success is exactly
    /// HTTP 200 with the body returned; the caller persists it.
    fn fetch(&self, token: &str) -> Result<Vec<u8>, SecretError>;
}

/// Blocking HTTP implementation of [`SecretStore`].
pub struct HttpSecretStore {
    endpoint: String,
    probe_endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpSecretStore {
    pub fn new(endpoint: &str, probe_endpoint: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            endpoint: endpoint.to_string(),
            probe_endpoint: probe_endpoint.to_string(),
            client,
        }
    }
}

impl SecretStore for HttpSecretStore {
    fn validate(&self, token: &str) -> bool {
        let result = self
            .client
            .get(&self.probe_endpoint)
            .basic_auth(token, Some(""))
            .send();
        match result {
            Ok(resp) => {
                let ok = resp.status().is_success();
                debug!(status = resp.status().as_u16(), ok, "token probe");
                ok
            }
            Err(e) => {
                warn!(error = %e, "token probe failed to reach secret store");
                false
            }
        }
    }

    fn fetch(&self, token: &str) -> Result<Vec<u8>, SecretError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("format", "env")])
            .basic_auth(token, Some(""))
            .send()
            .map_err(|e| SecretError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(SecretError::Status(status));
        }
        let body = resp
            .bytes()
            .map_err(|e| SecretError::Transport(e.to_string()))?;
        debug!(bytes = body.len(), "fetched secret set");
        Ok(body.to_vec())
    }
}
