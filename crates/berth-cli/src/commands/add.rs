//! `berth add` — register and start a new service.

use anyhow::Context;

use berth_core::env::EnvSet;
use berth_lifecycle::{AddRequest, Lifecycle};

use super::Env;
use crate::prompt;

pub struct AddArgs {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub image: Option<String>,
    pub token: Option<String>,
    pub health_path: Option<String>,
    pub defaults_file: Option<String>,
}

pub fn run(args: AddArgs) -> anyhow::Result<()> {
    let env = Env::load()?;

    let name = match args.name {
        Some(n) => n,
        None => prompt::required("Service name")?,
    };
    let hostname = match args.hostname {
        Some(h) => h,
        None => prompt::required("Routing hostname")?,
    };
    let image = match args.image {
        Some(i) => i,
        None => prompt::required("Image reference")?,
    };
    let token = match args.token {
        Some(t) => t,
        None => prompt::required("Secret store token")?,
    };
    let health_path = match args.health_path {
        Some(p) => Some(p),
        None => prompt::optional("Health-check path (empty for none)")?,
    };
    let defaults = match args.defaults_file {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read defaults file {path}"))?;
            EnvSet::parse(&text)
        }
        None => EnvSet::new(),
    };

    let lifecycle = Lifecycle::new(&env.registry, &env.runtime, &env.secrets, &env.config);
    let outcome = lifecycle.add(AddRequest {
        name,
        hostname,
        image,
        token,
        health_path,
        defaults,
    })?;

    println!(
        "✓ Registered '{}' → https://{} (backend port {})",
        outcome.record.name, outcome.record.hostname, outcome.record.port
    );
    match outcome.warning {
        None => println!("✓ Container is running"),
        Some(hint) => println!("⚠ {hint}"),
    }
    Ok(())
}
