pub mod add;
pub mod init;
pub mod remove;
pub mod restart;
pub mod status;
pub mod upgrade;

use anyhow::Context;

use berth_core::config::BerthConfig;
use berth_core::paths::ConfigRoot;
use berth_registry::Registry;
use berth_runtime::DockerCli;
use berth_secrets::HttpSecretStore;

/// Everything a lifecycle command needs, loaded from the config root.
pub struct Env {
    pub registry: Registry,
    pub runtime: DockerCli,
    pub secrets: HttpSecretStore,
    pub config: BerthConfig,
}

impl Env {
    /// Load settings and open the registry. Fails with a pointer to
    /// `berth init` when the host was never bootstrapped.
    pub fn load() -> anyhow::Result<Self> {
        let root = ConfigRoot::resolve();
        let settings = root.settings_path();
        if !settings.is_file() {
            anyhow::bail!(
                "no settings found at {} — run `berth init` first",
                settings.display()
            );
        }
        let config = BerthConfig::from_file(&settings)?;
        let registry = Registry::open(root).context("failed to open the service registry")?;
        let runtime = DockerCli::new();
        runtime
            .available()
            .context("docker is required — install it and make sure the daemon is running")?;
        let secrets =
            HttpSecretStore::new(&config.secrets.endpoint, &config.secrets.probe_endpoint);
        Ok(Self { registry, runtime, secrets, config })
    }
}
