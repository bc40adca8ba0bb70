//! `berth init` — one-time infrastructure bring-up.

use anyhow::Context;

use berth_core::config::BerthConfig;
use berth_core::paths::ConfigRoot;
use berth_proxy::emit_proxy_files;
use berth_runtime::{ContainerRuntime, DockerCli};

use crate::prompt;

pub fn run(secret_endpoint: Option<&str>, acme_email: Option<&str>) -> anyhow::Result<()> {
    let root = ConfigRoot::resolve();
    root.ensure_layout()
        .with_context(|| format!("failed to create {}", root.root().display()))?;

    let config = if root.settings_path().is_file() {
        println!("Using existing settings at {}", root.settings_path().display());
        BerthConfig::from_file(&root.settings_path())?
    } else {
        let endpoint = match secret_endpoint {
            Some(e) => e.to_string(),
            None => prompt::required("Secret store download endpoint")?,
        };
        let email = match acme_email {
            Some(e) => Some(e.to_string()),
            None => prompt::optional("ACME email (empty to skip)")?,
        };
        let config = BerthConfig::scaffold(&endpoint, email.as_deref());
        std::fs::write(root.settings_path(), config.to_toml_string()?)?;
        println!("Wrote {}", root.settings_path().display());
        config
    };

    emit_proxy_files(&root, &config.proxy)?;

    let runtime = DockerCli::new();
    runtime
        .available()
        .context("docker is required — install it and make sure the daemon is running")?;
    runtime.ensure_network(&config.proxy.network)?;
    runtime.up(&root.proxy_compose_path())?;

    println!("✓ Proxy infrastructure is up (network '{}')", config.proxy.network);
    Ok(())
}
