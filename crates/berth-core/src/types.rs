//! Domain types for registered services.
//!
//! A `ServiceRecord` is the durable description of one deployed container:
//! its identity, routing hostname, image reference, and backend port. All
//! types serialize to JSON for storage in the per-service metadata file.

use serde::{Deserialize, Serialize};

/// Unique identifier of a registered service.
pub type ServiceName = String;

/// Registry entry describing one deployed container's routing and identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRecord {
    /// Primary key. Immutable after creation; identifier-safe
    /// (letter first, then letters/digits/underscore).
    pub name: ServiceName,
    /// Public routing hostname. Unique across all records.
    pub hostname: String,
    /// Container image reference (opaque to berth).
    pub image: String,
    /// Backend port the proxy routes to. Sourced from the secret set's
    /// `PORT` key, never user-entered.
    pub port: u16,
    /// HTTP path for proxy health checks, if the service declares one.
    pub health_path: Option<String>,
    /// Unix timestamp (seconds) when the record was created.
    pub created_at: u64,
}

/// Observed runtime state of a service, derived from the container runtime.
/// The registry record is authoritative for existence; this only describes
/// what the runtime reports right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// No record exists.
    Absent,
    /// Record exists but no container was found.
    Registered,
    Running,
    Stopped,
    /// A remove operation is tearing the service down.
    Removing,
}

impl ServiceRecord {
    /// Current unix time in seconds, for `created_at` stamps.
    pub fn now_epoch() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
