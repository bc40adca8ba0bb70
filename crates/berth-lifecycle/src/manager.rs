//! Lifecycle manager — drives the per-service state machine.
//!
//! States per service: Absent, Registered, Running, Stopped, Removing.
//! Each workflow orders its side effects so the registry write (which
//! defines "Registered") happens only after every fallible step has
//! succeeded; an interrupt therefore always lands in a defined state.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use berth_core::config::{BerthConfig, ProxyConfig};
use berth_core::env::{merge, write_env_file, EnvSet};
use berth_core::types::ServiceRecord;
use berth_core::validate::{validate_hostname, validate_service_name};
use berth_registry::{OperationLock, Registry};
use berth_runtime::{render_service_compose, ContainerRuntime};
use berth_secrets::SecretStore;

use crate::error::{LifecycleError, LifecycleResult};

/// Inputs gathered (interactively or otherwise) for an add operation.
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub name: String,
    pub hostname: String,
    pub image: String,
    pub token: String,
    pub health_path: Option<String>,
    /// Declared default environment; fetched secrets win on collision.
    pub defaults: EnvSet,
}

/// Result of a successful add.
#[derive(Debug)]
pub struct AddOutcome {
    pub record: ServiceRecord,
    /// Whether the container reached running within the wait window.
    pub running: bool,
    /// Guidance when verification timed out; never a hard failure.
    pub warning: Option<String>,
}

/// Result of a successful upgrade.
#[derive(Debug)]
pub struct UpgradeOutcome {
    pub record: ServiceRecord,
    /// (old, new) when the secret set changed the backend port.
    pub port_changed: Option<(u16, u16)>,
    /// False when no stored token exists and secrets were left untouched.
    pub secrets_refreshed: bool,
    pub running: bool,
    pub warning: Option<String>,
}

/// Result of a restart.
#[derive(Debug)]
pub struct RestartOutcome {
    pub running: bool,
    pub warning: Option<String>,
}

/// Both gates required before a remove may touch anything.
#[derive(Debug, Clone)]
pub struct RemovalConfirmation {
    /// Affirmative yes/no answer.
    pub affirmed: bool,
    /// The service name as re-typed by the operator.
    pub typed_name: String,
}

/// Drives add / upgrade / remove / status against the registry, the
/// secret store, and the container runtime.
pub struct Lifecycle<'a, R, S> {
    pub(crate) registry: &'a Registry,
    pub(crate) runtime: &'a R,
    secrets: &'a S,
    pub(crate) proxy: ProxyConfig,
    verify_wait: Duration,
    poll_interval: Duration,
}

impl<'a, R: ContainerRuntime, S: SecretStore> Lifecycle<'a, R, S> {
    pub fn new(registry: &'a Registry, runtime: &'a R, secrets: &'a S, config: &BerthConfig) -> Self {
        Self {
            registry,
            runtime,
            secrets,
            proxy: config.proxy.clone(),
            verify_wait: Duration::from_secs(config.verify_wait_secs()),
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Override the verification polling cadence.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    // ── Add: Absent → Registered → Running ─────────────────────────

    pub fn add(&self, request: AddRequest) -> LifecycleResult<AddOutcome> {
        validate_service_name(&request.name)?;
        validate_hostname(&request.hostname)?;
        if self.registry.exists(&request.name) {
            return Err(LifecycleError::DuplicateName(request.name.clone()));
        }
        let _lock = OperationLock::acquire(self.registry.config_root(), &request.name)?;
        self.registry.check_hostname_free(&request.hostname, None)?;

        if !self.secrets.validate(&request.token) {
            return Err(LifecycleError::Auth);
        }
        let body = self.secrets.fetch(&request.token)?;
        let fetched = EnvSet::parse(&String::from_utf8_lossy(&body));
        let merged = merge(&request.defaults, &fetched);
        let port = require_port(&merged)?;

        // All fallible checks have passed; materialize artifacts. The
        // guard removes everything if any write below fails.
        let record = ServiceRecord {
            name: request.name.clone(),
            hostname: request.hostname.clone(),
            image: request.image.clone(),
            port,
            health_path: request.health_path.clone(),
            created_at: ServiceRecord::now_epoch(),
        };
        let mut guard = PartialCleanup::armed(self.registry, &request.name);
        self.write_artifacts(&record, &merged, &request.defaults)?;
        self.registry.store_token(&request.name, &request.token)?;
        self.registry.write(&record)?;
        guard.disarm();
        info!(service = %record.name, hostname = %record.hostname, port, "service registered");

        self.runtime.up(&self.registry.config_root().compose_path(&record.name))?;
        let (running, warning) = self.verify_running(&record.name);
        Ok(AddOutcome { record, running, warning })
    }

    // ── Upgrade: Registered/Running → Running ──────────────────────

    pub fn upgrade(&self, name: &str) -> LifecycleResult<UpgradeOutcome> {
        let _lock = OperationLock::acquire(self.registry.config_root(), name)?;
        let mut record = self.registry.read(name)?;
        let root = self.registry.config_root();

        let old_port = record.port;
        let mut secrets_refreshed = false;
        match self.registry.read_token(name)? {
            None => {
                warn!(service = name, "no stored token — treating secrets as unmanaged, leaving env untouched");
            }
            Some(token) => {
                // The environment is regenerated wholesale from the
                // declared defaults and the freshly fetched secrets, so
                // keys removed from the secret store drop out here.
                let declared = match std::fs::read_to_string(root.defaults_path(name)) {
                    Ok(text) => EnvSet::parse(&text),
                    Err(_) => EnvSet::new(),
                };
                let body = self.secrets.fetch(&token)?;
                let fetched = EnvSet::parse(&String::from_utf8_lossy(&body));
                let merged = merge(&declared, &fetched);
                record.port = require_port(&merged)?;

                // Keep the previous env as the known-good backup, then
                // replace it atomically.
                if root.env_path(name).is_file() {
                    std::fs::copy(root.env_path(name), root.env_backup_path(name))
                        .map_err(berth_registry::RegistryError::from)?;
                }
                write_env_file(&root.env_path(name), &merged)
                    .map_err(berth_registry::RegistryError::from)?;
                secrets_refreshed = true;
            }
        }

        let port_changed = (record.port != old_port).then_some((old_port, record.port));
        if let Some((old, new)) = port_changed {
            info!(service = name, old, new, "backend port changed");
        }

        // Routing config is regenerated wholesale every upgrade.
        let compose = render_service_compose(&record, &self.proxy)?;
        std::fs::write(root.compose_path(name), compose)
            .map_err(berth_registry::RegistryError::from)?;
        self.registry.write(&record)?;

        let compose_path = root.compose_path(name);
        self.runtime.pull(&compose_path)?;
        self.runtime.down(&compose_path, false)?;
        self.runtime.up(&compose_path)?;
        let (running, warning) = self.verify_running(name);
        info!(service = name, running, "service upgraded");
        Ok(UpgradeOutcome {
            record,
            port_changed,
            secrets_refreshed,
            running,
            warning,
        })
    }

    // ── Restart ────────────────────────────────────────────────────

    /// Bounce a service's container without touching secrets, env, or
    /// routing config.
    pub fn restart(&self, name: &str) -> LifecycleResult<RestartOutcome> {
        let _lock = OperationLock::acquire(self.registry.config_root(), name)?;
        if !self.registry.exists(name) {
            return Err(berth_registry::RegistryError::NotFound(name.to_string()).into());
        }

        self.runtime.restart(&self.registry.config_root().compose_path(name))?;
        let (running, warning) = self.verify_running(name);
        info!(service = name, running, "service restarted");
        Ok(RestartOutcome { running, warning })
    }

    // ── Remove ─────────────────────────────────────────────────────

    pub fn remove(&self, name: &str, confirmation: &RemovalConfirmation) -> LifecycleResult<()> {
        if !confirmation.affirmed || confirmation.typed_name != name {
            return Err(LifecycleError::ConfirmationRejected);
        }
        let _lock = OperationLock::acquire(self.registry.config_root(), name)?;
        if !self.registry.exists(name) {
            return Err(berth_registry::RegistryError::NotFound(name.to_string()).into());
        }

        let compose_path = self.registry.config_root().compose_path(name);
        if compose_path.is_file() {
            self.runtime.down(&compose_path, true)?;
        }
        self.registry.delete(name)?;
        info!(service = name, "service removed");
        Ok(())
    }

    // ── Shared helpers ─────────────────────────────────────────────

    fn write_artifacts(
        &self,
        record: &ServiceRecord,
        env: &EnvSet,
        defaults: &EnvSet,
    ) -> LifecycleResult<()> {
        let root = self.registry.config_root();
        std::fs::create_dir_all(root.service_dir(&record.name))
            .map_err(berth_registry::RegistryError::from)?;
        write_env_file(&root.env_path(&record.name), env)
            .map_err(berth_registry::RegistryError::from)?;
        write_env_file(&root.defaults_path(&record.name), defaults)
            .map_err(berth_registry::RegistryError::from)?;
        let compose = render_service_compose(record, &self.proxy)?;
        std::fs::write(root.compose_path(&record.name), compose)
            .map_err(berth_registry::RegistryError::from)?;
        Ok(())
    }

    /// Poll the runtime until the container reports running or the wait
    /// window elapses. Elapsing is a warning, never a hard failure —
    /// image pulls can outlast any reasonable window.
    pub(crate) fn verify_running(&self, name: &str) -> (bool, Option<String>) {
        let deadline = Instant::now() + self.verify_wait;
        loop {
            if let Ok(Some(status)) = self.runtime.inspect(name) {
                if status.is_running() {
                    return (true, None);
                }
            }
            if Instant::now() >= deadline {
                let mut hint = format!(
                    "'{name}' has not reached running after {}s — it may still be pulling; \
                     check `berth status` and the container logs",
                    self.verify_wait.as_secs()
                );
                let compose_path = self.registry.config_root().compose_path(name);
                if let Ok(tail) = self.runtime.logs(&compose_path, 20) {
                    let tail = tail.trim();
                    if !tail.is_empty() {
                        hint.push_str(&format!("; recent logs:\n{tail}"));
                    }
                }
                warn!(service = name, "{hint}");
                return (false, Some(hint));
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

/// Extract and validate the required `PORT` key from a merged environment.
fn require_port(env: &EnvSet) -> LifecycleResult<u16> {
    let value = env
        .get("PORT")
        .ok_or_else(|| LifecycleError::RequiredFieldMissing("PORT".to_string()))?;
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(LifecycleError::InvalidPort(value.to_string())),
    }
}

/// Removes every partial artifact for a service unless disarmed.
struct PartialCleanup<'a> {
    registry: &'a Registry,
    name: &'a str,
    armed: bool,
}

impl<'a> PartialCleanup<'a> {
    fn armed(registry: &'a Registry, name: &'a str) -> Self {
        Self { registry, name, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialCleanup<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.registry.delete(self.name) {
                warn!(service = %self.name, error = %e, "failed to clean up partial service state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_port_accepts_valid_values() {
        let env = EnvSet::parse("PORT=8080\n");
        assert_eq!(require_port(&env).unwrap(), 8080);
    }

    #[test]
    fn require_port_missing_is_required_field() {
        let env = EnvSet::parse("DB=x\n");
        assert!(matches!(
            require_port(&env),
            Err(LifecycleError::RequiredFieldMissing(k)) if k == "PORT"
        ));
    }

    #[test]
    fn require_port_rejects_garbage_and_zero() {
        for bad in ["0", "-1", "70000", "eighty"] {
            let env = EnvSet::parse(&format!("PORT={bad}\n"));
            assert!(
                matches!(require_port(&env), Err(LifecycleError::InvalidPort(_))),
                "PORT={bad} should be rejected"
            );
        }
    }
}
