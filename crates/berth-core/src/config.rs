//! berth.toml global settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BerthConfig {
    pub secrets: SecretsConfig,
    pub proxy: ProxyConfig,
    pub lifecycle: Option<LifecycleConfig>,
}

/// Secret store endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Download endpoint returning `KEY=VALUE` lines for `?format=env`.
    pub endpoint: String,
    /// Cheap authenticated read used to validate tokens.
    pub probe_endpoint: String,
}

/// Reverse proxy wiring shared by all services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Docker network joining the proxy and every service.
    pub network: String,
    /// TLS certificate resolver name referenced from routing labels.
    pub cert_resolver: String,
    /// Email handed to the ACME resolver at bootstrap.
    pub acme_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Seconds to wait for a container to reach running after start.
    pub verify_wait_secs: Option<u64>,
}

impl BerthConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.display().to_string(), e.to_string()))?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Render(e.to_string()))
    }

    /// Scaffold default settings for a fresh install.
    pub fn scaffold(secret_endpoint: &str, acme_email: Option<&str>) -> Self {
        BerthConfig {
            secrets: SecretsConfig {
                endpoint: secret_endpoint.to_string(),
                probe_endpoint: default_probe_endpoint(secret_endpoint),
            },
            proxy: ProxyConfig {
                network: "berth-proxy".to_string(),
                cert_resolver: "letsencrypt".to_string(),
                acme_email: acme_email.map(str::to_string),
            },
            lifecycle: Some(LifecycleConfig {
                verify_wait_secs: Some(10),
            }),
        }
    }

    pub fn verify_wait_secs(&self) -> u64 {
        self.lifecycle
            .as_ref()
            .and_then(|l| l.verify_wait_secs)
            .unwrap_or(10)
    }
}

/// Derive a probe URL from the download endpoint's origin.
fn default_probe_endpoint(endpoint: &str) -> String {
    match endpoint.find("://").map(|i| i + 3) {
        Some(host_start) => match endpoint[host_start..].find('/') {
            Some(path_start) => format!("{}/v3/me", &endpoint[..host_start + path_start]),
            None => format!("{endpoint}/v3/me"),
        },
        None => format!("{endpoint}/v3/me"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Read(String, String),

    #[error("failed to parse {0}: {1}")]
    Parse(String, String),

    #[error("failed to render settings: {0}")]
    Render(String),
}
