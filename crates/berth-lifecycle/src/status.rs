//! Status — read-only aggregation across the registry and runtime.
//!
//! Status never mutates anything. A registered service whose container
//! is gone is reported as such, not treated as an error; a managed
//! container without a record is surfaced as an orphan.

use serde::Serialize;
use tracing::warn;

use berth_core::types::ServiceState;
use berth_proxy::PROXY_CONTAINER;
use berth_runtime::{ContainerRuntime, ContainerStatus};
use berth_secrets::SecretStore;

use crate::error::LifecycleResult;
use crate::manager::Lifecycle;

/// One row of the status listing.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub hostname: String,
    pub image: String,
    pub port: u16,
    pub state: ServiceState,
    pub health: Option<String>,
    pub started_at: Option<String>,
}

/// State of the proxy infrastructure.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyStatus {
    /// Inspect result for the proxy container; None when absent.
    pub container: Option<String>,
    pub bootstrap_files_present: bool,
}

/// The full read-only report.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub services: Vec<ServiceStatus>,
    pub proxy: ProxyStatus,
    /// Managed containers with no registry record.
    pub orphans: Vec<String>,
}

impl<R: ContainerRuntime, S: SecretStore> Lifecycle<'_, R, S> {
    /// Aggregate the state of every registered service plus the proxy.
    pub fn status(&self) -> LifecycleResult<StatusReport> {
        let names = self.registry.list()?;
        let mut services = Vec::with_capacity(names.len());
        for name in &names {
            let record = self.registry.read(name)?;
            let container = self.inspect_tolerant(name);
            let state = match &container {
                None => ServiceState::Registered,
                Some(c) if c.is_running() => ServiceState::Running,
                Some(_) => ServiceState::Stopped,
            };
            services.push(ServiceStatus {
                name: record.name,
                hostname: record.hostname,
                image: container
                    .as_ref()
                    .map(|c| c.image.clone())
                    .unwrap_or(record.image),
                port: record.port,
                state,
                health: container.as_ref().and_then(|c| c.health.clone()),
                started_at: container.as_ref().and_then(|c| c.started_at.clone()),
            });
        }

        let root = self.registry.config_root();
        let proxy = ProxyStatus {
            container: self
                .inspect_tolerant(PROXY_CONTAINER)
                .map(|c| c.state),
            bootstrap_files_present: root.proxy_compose_path().is_file()
                && root.proxy_static_path().is_file(),
        };

        let orphans = match self.runtime.list_managed() {
            Ok(managed) => managed
                .into_iter()
                .filter(|m| !names.contains(m))
                .collect(),
            Err(e) => {
                warn!(error = %e, "could not list managed containers; skipping orphan check");
                Vec::new()
            }
        };
        for orphan in &orphans {
            warn!(container = %orphan, "managed container has no registry record");
        }

        Ok(StatusReport { services, proxy, orphans })
    }

    /// Inspect a container, treating runtime trouble as "not found" so a
    /// single broken container cannot fail the whole listing.
    fn inspect_tolerant(&self, name: &str) -> Option<ContainerStatus> {
        match self.runtime.inspect(name) {
            Ok(found) => found,
            Err(e) => {
                warn!(container = name, error = %e, "inspect failed during status");
                None
            }
        }
    }
}
