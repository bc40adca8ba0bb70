//! `berth upgrade` — refresh secrets, pull, and restart a service.

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
    let outcome = lifecycle.upgrade(&name)?;

    if !outcome.secrets_refreshed {
        println!("⚠ No stored token for '{name}' — secrets left untouched");
    }
    if let Some((old, new)) = outcome.port_changed {
        println!("✓ Backend port changed {old} → {new}; routing updated");
    }
    println!("✓ Upgraded '{name}' ({})", outcome.record.image);
    match outcome.warning {
        None => println!("✓ Container is running"),
        Some(hint) => println!("⚠ {hint}"),
    }
    Ok(())
}
