//! `berth restart` — bounce a service's container in place.

use berth_lifecycle::Lifecycle;

use super::Env;
use crate::prompt;

pub fn run(name: Option<&str>) -> anyhow::Result<()> {
    let env = Env::load()?;
    let name = match name {
        Some(n) => n.to_string(),
        None => prompt::required("Service name")?,
    };

    let lifecycle = Lifecycle::new(&env.registry, &env.runtime, &env.secrets, &env.config);
    let outcome = lifecycle.restart(&name)?;

    println!("✓ Restarted '{name}'");
    match outcome.warning {
        None => println!("✓ Container is running"),
        Some(hint) => println!("⚠ {hint}"),
    }
    Ok(())
}
