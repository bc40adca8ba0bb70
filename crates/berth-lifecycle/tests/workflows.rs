//! End-to-end lifecycle workflows over an in-memory runtime and secret
//! store, with registry state on a temp directory.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use berth_core::config::BerthConfig;
use berth_core::env::EnvSet;
use berth_core::paths::ConfigRoot;
use berth_core::types::ServiceState;
use berth_lifecycle::{AddRequest, Lifecycle, LifecycleError, RemovalConfirmation};
use berth_registry::{OperationLock, Registry, RegistryError};
use berth_runtime::{ContainerRuntime, ContainerStatus, RuntimeResult};
use berth_secrets::{SecretError, SecretStore};

// ── Mocks ──────────────────────────────────────────────────────────

#[derive(Default)]
struct MockRuntime {
    containers: Mutex<HashMap<String, ContainerStatus>>,
    ops: Mutex<Vec<String>>,
    /// When set, `up` leaves containers in "created" instead of "running",
    /// simulating a slow image pull.
    slow_start: std::sync::atomic::AtomicBool,
    /// What `logs` returns.
    log_output: Mutex<String>,
}

impl MockRuntime {
    fn running_status(image: &str) -> ContainerStatus {
        ContainerStatus {
            state: "running".to_string(),
            health: Some("healthy".to_string()),
            image: image.to_string(),
            started_at: Some("2026-08-25T10:00:00Z".to_string()),
        }
    }

    fn service_of(compose_file: &Path) -> String {
        compose_file
            .parent()
            .and_then(|d| d.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .expect("compose path has a service dir")
    }

    fn insert_container(&self, name: &str, status: ContainerStatus) {
        self.containers.lock().unwrap().insert(name.to_string(), status);
    }

    fn remove_container(&self, name: &str) {
        self.containers.lock().unwrap().remove(name);
    }

    fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    fn log(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }
}

impl ContainerRuntime for MockRuntime {
    fn up(&self, compose_file: &Path) -> RuntimeResult<()> {
        let name = Self::service_of(compose_file);
        self.log(format!("up {name}"));
        // Image reference comes from the rendered compose file.
        let compose = std::fs::read_to_string(compose_file).unwrap_or_default();
        let image = compose
            .lines()
            .find_map(|l| l.trim().strip_prefix("image: "))
            .unwrap_or("unknown")
            .to_string();
        let mut status = Self::running_status(&image);
        if self.slow_start.load(std::sync::atomic::Ordering::Relaxed) {
            status.state = "created".to_string();
            status.health = None;
        }
        self.insert_container(&name, status);
        Ok(())
    }

    fn down(&self, compose_file: &Path, remove_volumes: bool) -> RuntimeResult<()> {
        let name = Self::service_of(compose_file);
        self.log(format!("down {name} volumes={remove_volumes}"));
        self.remove_container(&name);
        Ok(())
    }

    fn pull(&self, compose_file: &Path) -> RuntimeResult<()> {
        self.log(format!("pull {}", Self::service_of(compose_file)));
        Ok(())
    }

    fn restart(&self, compose_file: &Path) -> RuntimeResult<()> {
        self.log(format!("restart {}", Self::service_of(compose_file)));
        Ok(())
    }

    fn logs(&self, compose_file: &Path, _tail: u32) -> RuntimeResult<String> {
        self.log(format!("logs {}", Self::service_of(compose_file)));
        Ok(self.log_output.lock().unwrap().clone())
    }

    fn inspect(&self, container: &str) -> RuntimeResult<Option<ContainerStatus>> {
        Ok(self.containers.lock().unwrap().get(container).cloned())
    }

    fn list_managed(&self) -> RuntimeResult<Vec<String>> {
        let mut names: Vec<String> = self.containers.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn ensure_network(&self, name: &str) -> RuntimeResult<()> {
        self.log(format!("network {name}"));
        Ok(())
    }
}

enum MockFetch {
    Body(&'static str),
    Status(u16),
    Transport,
}

struct MockSecrets {
    valid: bool,
    fetch: Mutex<MockFetch>,
}

impl MockSecrets {
    fn with_body(body: &'static str) -> Self {
        Self { valid: true, fetch: Mutex::new(MockFetch::Body(body)) }
    }

    fn set_fetch(&self, fetch: MockFetch) {
        *self.fetch.lock().unwrap() = fetch;
    }
}

impl SecretStore for MockSecrets {
    fn validate(&self, _token: &str) -> bool {
        self.valid
    }

    fn fetch(&self, _token: &str) -> Result<Vec<u8>, SecretError> {
        match &*self.fetch.lock().unwrap() {
            MockFetch::Body(body) => Ok(body.as_bytes().to_vec()),
            MockFetch::Status(code) => Err(SecretError::Status(*code)),
            MockFetch::Transport => Err(SecretError::Transport("connection refused".to_string())),
        }
    }
}

// ── Harness ────────────────────────────────────────────────────────

struct Harness {
    _dir: tempfile::TempDir,
    registry: Registry,
    runtime: MockRuntime,
    secrets: MockSecrets,
    config: BerthConfig,
}

impl Harness {
    fn new(secret_body: &'static str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(ConfigRoot::new(dir.path().join("state"))).unwrap();
        let mut config = BerthConfig::scaffold("https://secrets.test/download", None);
        if let Some(lifecycle) = config.lifecycle.as_mut() {
            lifecycle.verify_wait_secs = Some(0);
        }
        Self {
            _dir: dir,
            registry,
            runtime: MockRuntime::default(),
            secrets: MockSecrets::with_body(secret_body),
            config,
        }
    }

    fn lifecycle(&self) -> Lifecycle<'_, MockRuntime, MockSecrets> {
        Lifecycle::new(&self.registry, &self.runtime, &self.secrets, &self.config)
    }

    fn add_request(name: &str, hostname: &str) -> AddRequest {
        AddRequest {
            name: name.to_string(),
            hostname: hostname.to_string(),
            image: "registry/img:latest".to_string(),
            token: "dp.st.token".to_string(),
            health_path: None,
            defaults: EnvSet::parse("NODE_ENV=production\n"),
        }
    }

    fn assert_no_residue(&self, name: &str) {
        assert!(!self.registry.exists(name));
        let root = self.registry.config_root();
        assert!(!root.service_dir(name).exists(), "service dir left behind");
        assert!(!root.token_path(name).exists(), "token left behind");
    }
}

// ── Add ────────────────────────────────────────────────────────────

#[test]
fn add_registers_service_and_starts_container() {
    let h = Harness::new("PORT=8080\nDB=x\n");
    let outcome = h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();

    assert_eq!(outcome.record.port, 8080);
    assert!(outcome.running);
    assert!(outcome.warning.is_none());
    assert!(h.registry.exists("svc_a"));

    let record = h.registry.read("svc_a").unwrap();
    assert_eq!(record.hostname, "api.example.com");
    assert_eq!(record.port, 8080);

    // Merged environment: secrets win, defaults additive.
    let env_text =
        std::fs::read_to_string(h.registry.config_root().env_path("svc_a")).unwrap();
    let env = EnvSet::parse(&env_text);
    assert_eq!(env.get("PORT"), Some("8080"));
    assert_eq!(env.get("DB"), Some("x"));
    assert_eq!(env.get("NODE_ENV"), Some("production"));

    let compose =
        std::fs::read_to_string(h.registry.config_root().compose_path("svc_a")).unwrap();
    assert!(compose.contains("loadbalancer.server.port=8080"));
    assert_eq!(h.registry.read_token("svc_a").unwrap().as_deref(), Some("dp.st.token"));
    assert!(h.runtime.ops().contains(&"up svc_a".to_string()));

    // Declared defaults are persisted so upgrades can re-merge wholesale.
    let defaults_text =
        std::fs::read_to_string(h.registry.config_root().defaults_path("svc_a")).unwrap();
    assert_eq!(
        EnvSet::parse(&defaults_text).get("NODE_ENV"),
        Some("production")
    );
}

#[test]
fn add_rejects_malformed_names_before_any_mutation() {
    let h = Harness::new("PORT=8080\n");
    for bad in ["2fast", "my-svc", ""] {
        let err = h.lifecycle().add(Harness::add_request(bad, "x.example.com")).unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)), "{bad}");
    }
    assert!(h.registry.list().unwrap().is_empty());
    assert!(h.runtime.ops().is_empty());
}

#[test]
fn add_rejects_duplicate_name() {
    let h = Harness::new("PORT=8080\n");
    h.lifecycle().add(Harness::add_request("svc_a", "a.example.com")).unwrap();

    let err = h.lifecycle().add(Harness::add_request("svc_a", "b.example.com")).unwrap_err();
    assert!(matches!(err, LifecycleError::DuplicateName(_)));
}

#[test]
fn add_rejects_claimed_hostname() {
    let h = Harness::new("PORT=8080\n");
    h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();

    let err = h.lifecycle().add(Harness::add_request("svc_b", "api.example.com")).unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Registry(RegistryError::HostnameTaken(_, _))
    ));
    h.assert_no_residue("svc_b");
}

#[test]
fn add_with_rejected_token_aborts_cleanly() {
    let mut h = Harness::new("PORT=8080\n");
    h.secrets.valid = false;

    let err = h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap_err();
    assert!(matches!(err, LifecycleError::Auth));
    h.assert_no_residue("svc_a");
}

#[test]
fn add_fetch_failure_leaves_no_residue() {
    let h = Harness::new("PORT=8080\n");
    h.secrets.set_fetch(MockFetch::Status(500));

    let err = h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap_err();
    assert!(matches!(err, LifecycleError::SecretStore(_)));
    h.assert_no_residue("svc_a");
    assert!(h.runtime.ops().is_empty(), "runtime must not be touched");
}

#[test]
fn add_transport_failure_leaves_no_residue() {
    let h = Harness::new("PORT=8080\n");
    h.secrets.set_fetch(MockFetch::Transport);

    let err = h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap_err();
    assert!(matches!(err, LifecycleError::SecretStore(SecretError::Transport(_))));
    h.assert_no_residue("svc_a");
}

#[test]
fn add_without_port_is_fatal_with_no_residue() {
    let h = Harness::new("DB=x\n");

    let err = h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap_err();
    assert!(matches!(err, LifecycleError::RequiredFieldMissing(k) if k == "PORT"));
    h.assert_no_residue("svc_a");
}

#[test]
fn add_reports_warning_not_failure_when_container_lags() {
    let h = Harness::new("PORT=8080\n");
    h.runtime
        .slow_start
        .store(true, std::sync::atomic::Ordering::Relaxed);
    *h.runtime.log_output.lock().unwrap() = "pulling layer 3/7".to_string();

    let outcome = h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();
    assert!(!outcome.running);
    let warning = outcome.warning.expect("timeout must downgrade to a warning");
    assert!(warning.contains("pulling layer 3/7"), "guidance includes recent logs");
    // The service is still fully registered.
    assert!(h.registry.exists("svc_a"));
}

#[test]
fn add_fails_fast_when_operation_lock_is_held() {
    let h = Harness::new("PORT=8080\n");
    let _held = OperationLock::acquire(h.registry.config_root(), "svc_a").unwrap();

    let err = h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap_err();
    assert!(matches!(err, LifecycleError::Registry(RegistryError::Locked(_))));
}

// ── Upgrade ────────────────────────────────────────────────────────

#[test]
fn upgrade_propagates_port_change_into_record_and_labels() {
    let h = Harness::new("PORT=8080\nDB=x\n");
    h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();

    h.secrets.set_fetch(MockFetch::Body("PORT=9090\nDB=x\n"));
    let outcome = h.lifecycle().upgrade("svc_a").unwrap();

    assert_eq!(outcome.port_changed, Some((8080, 9090)));
    assert!(outcome.secrets_refreshed);
    assert_eq!(h.registry.read("svc_a").unwrap().port, 9090);

    let compose =
        std::fs::read_to_string(h.registry.config_root().compose_path("svc_a")).unwrap();
    assert!(compose.contains("loadbalancer.server.port=9090"));
    assert!(!compose.contains("=8080"));

    // Previous env kept as backup.
    let backup =
        std::fs::read_to_string(h.registry.config_root().env_backup_path("svc_a")).unwrap();
    assert!(backup.contains("PORT=8080"));

    let ops = h.runtime.ops();
    let pull = ops.iter().position(|o| o == "pull svc_a").unwrap();
    let down = ops.iter().position(|o| o == "down svc_a volumes=false").unwrap();
    let up = ops.iter().rposition(|o| o == "up svc_a").unwrap();
    assert!(pull < down && down < up, "pull, stop, start order: {ops:?}");
}

#[test]
fn upgrade_regenerates_env_from_declared_defaults() {
    let h = Harness::new("PORT=8080\nDB=x\n");
    h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();

    // DB was removed from the secret store; the regenerated environment
    // must not carry it forward, while declared defaults survive.
    h.secrets.set_fetch(MockFetch::Body("PORT=8080\n"));
    h.lifecycle().upgrade("svc_a").unwrap();

    let env_text =
        std::fs::read_to_string(h.registry.config_root().env_path("svc_a")).unwrap();
    let env = EnvSet::parse(&env_text);
    assert_eq!(env.get("NODE_ENV"), Some("production"));
    assert_eq!(env.get("DB"), None, "revoked secret must not linger");
    assert_eq!(env.get("PORT"), Some("8080"));
}

#[test]
fn upgrade_without_stored_token_skips_secret_refresh() {
    let h = Harness::new("PORT=8080\n");
    h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();
    std::fs::remove_file(h.registry.config_root().token_path("svc_a")).unwrap();
    let env_before =
        std::fs::read_to_string(h.registry.config_root().env_path("svc_a")).unwrap();

    let outcome = h.lifecycle().upgrade("svc_a").unwrap();
    assert!(!outcome.secrets_refreshed);
    assert_eq!(outcome.port_changed, None);

    let env_after =
        std::fs::read_to_string(h.registry.config_root().env_path("svc_a")).unwrap();
    assert_eq!(env_before, env_after, "unmanaged env must not be touched");
}

#[test]
fn upgrade_fetch_failure_preserves_previous_env() {
    let h = Harness::new("PORT=8080\nDB=x\n");
    h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();
    let env_before =
        std::fs::read_to_string(h.registry.config_root().env_path("svc_a")).unwrap();

    h.secrets.set_fetch(MockFetch::Status(503));
    let err = h.lifecycle().upgrade("svc_a").unwrap_err();
    assert!(matches!(err, LifecycleError::SecretStore(_)));

    let env_after =
        std::fs::read_to_string(h.registry.config_root().env_path("svc_a")).unwrap();
    assert_eq!(env_before, env_after);
    assert!(!env_after.is_empty(), "env must never end up empty");
    assert_eq!(h.registry.read("svc_a").unwrap().port, 8080);
}

#[test]
fn upgrade_of_unknown_service_is_not_found() {
    let h = Harness::new("PORT=8080\n");
    let err = h.lifecycle().upgrade("ghost").unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Registry(RegistryError::NotFound(_))
    ));
}

// ── Remove ─────────────────────────────────────────────────────────

#[test]
fn remove_requires_exact_retyped_name() {
    let h = Harness::new("PORT=8080\n");
    h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();

    let err = h
        .lifecycle()
        .remove(
            "svc_a",
            &RemovalConfirmation { affirmed: true, typed_name: "svc_b".to_string() },
        )
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ConfirmationRejected));
    assert!(h.registry.exists("svc_a"), "registry must be unchanged");
    assert!(h.runtime.inspect("svc_a").unwrap().is_some());
}

#[test]
fn remove_requires_affirmation() {
    let h = Harness::new("PORT=8080\n");
    h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();

    let err = h
        .lifecycle()
        .remove(
            "svc_a",
            &RemovalConfirmation { affirmed: false, typed_name: "svc_a".to_string() },
        )
        .unwrap_err();
    assert!(matches!(err, LifecycleError::ConfirmationRejected));
    assert!(h.registry.exists("svc_a"));
}

#[test]
fn remove_tears_down_container_volumes_and_artifacts() {
    let h = Harness::new("PORT=8080\n");
    h.lifecycle().add(Harness::add_request("svc_a", "api.example.com")).unwrap();

    h.lifecycle()
        .remove(
            "svc_a",
            &RemovalConfirmation { affirmed: true, typed_name: "svc_a".to_string() },
        )
        .unwrap();

    h.assert_no_residue("svc_a");
    assert!(h.runtime.inspect("svc_a").unwrap().is_none());
    assert!(h.runtime.ops().contains(&"down svc_a volumes=true".to_string()));
}

// ── Restart ────────────────────────────────────────────────────────

#[test]
fn restart_bounces_without_touching_env_or_routing() {
    let h = Harness::new("PORT=8080\n");
    let lifecycle = h.lifecycle();
    lifecycle.add(Harness::add_request("svc_a", "a.example.com")).unwrap();
    let env_before =
        std::fs::read_to_string(h.registry.config_root().env_path("svc_a")).unwrap();
    let compose_before =
        std::fs::read_to_string(h.registry.config_root().compose_path("svc_a")).unwrap();

    let outcome = lifecycle.restart("svc_a").unwrap();
    assert!(outcome.running);
    assert!(h.runtime.ops().contains(&"restart svc_a".to_string()));
    assert_eq!(
        std::fs::read_to_string(h.registry.config_root().env_path("svc_a")).unwrap(),
        env_before
    );
    assert_eq!(
        std::fs::read_to_string(h.registry.config_root().compose_path("svc_a")).unwrap(),
        compose_before
    );
}

#[test]
fn restart_of_unknown_service_is_not_found() {
    let h = Harness::new("PORT=8080\n");
    let err = h.lifecycle().restart("ghost").unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Registry(RegistryError::NotFound(_))
    ));
}

// ── Status ─────────────────────────────────────────────────────────

#[test]
fn status_on_empty_registry_is_empty_not_an_error() {
    let h = Harness::new("PORT=8080\n");
    let report = h.lifecycle().status().unwrap();
    assert!(report.services.is_empty());
    assert!(report.orphans.is_empty());
}

#[test]
fn status_reports_running_stopped_and_missing_containers() {
    let h = Harness::new("PORT=8080\n");
    let lifecycle = h.lifecycle();
    lifecycle.add(Harness::add_request("svc_a", "a.example.com")).unwrap();
    lifecycle.add(Harness::add_request("svc_b", "b.example.com")).unwrap();
    lifecycle.add(Harness::add_request("svc_c", "c.example.com")).unwrap();

    // svc_b's container exited; svc_c's vanished entirely.
    h.runtime.insert_container(
        "svc_b",
        ContainerStatus {
            state: "exited".to_string(),
            health: None,
            image: "registry/img:latest".to_string(),
            started_at: None,
        },
    );
    h.runtime.remove_container("svc_c");

    let report = lifecycle.status().unwrap();
    let states: Vec<_> = report.services.iter().map(|s| (s.name.as_str(), s.state)).collect();
    assert_eq!(
        states,
        vec![
            ("svc_a", ServiceState::Running),
            ("svc_b", ServiceState::Stopped),
            ("svc_c", ServiceState::Registered),
        ]
    );
}

#[test]
fn status_surfaces_orphan_containers() {
    let h = Harness::new("PORT=8080\n");
    let lifecycle = h.lifecycle();
    lifecycle.add(Harness::add_request("svc_a", "a.example.com")).unwrap();
    h.runtime
        .insert_container("ghost", MockRuntime::running_status("who/knows:latest"));

    let report = lifecycle.status().unwrap();
    assert_eq!(report.orphans, vec!["ghost".to_string()]);
    assert_eq!(report.services.len(), 1);
}

#[test]
fn status_finds_proxy_under_its_assigned_container_name() {
    let h = Harness::new("PORT=8080\n");
    h.runtime.insert_container(
        berth_proxy::PROXY_CONTAINER,
        MockRuntime::running_status("traefik:v3.1"),
    );

    let report = h.lifecycle().status().unwrap();
    assert_eq!(report.proxy.container.as_deref(), Some("running"));
}

#[test]
fn status_does_not_mutate_state() {
    let h = Harness::new("PORT=8080\n");
    let lifecycle = h.lifecycle();
    lifecycle.add(Harness::add_request("svc_a", "a.example.com")).unwrap();
    let ops_before = h.runtime.ops().len();

    lifecycle.status().unwrap();
    // Only read operations happened: no up/down/pull entries were added.
    assert_eq!(h.runtime.ops().len(), ops_before);
    assert!(h.registry.exists("svc_a"));
}
