//! `berth remove` — irreversible teardown, double-confirmed.

use berth_lifecycle::{Lifecycle, RemovalConfirmation};

use super::Env;
use crate::prompt;

pub fn run(name: Option<&str>) -> anyhow::Result<()> {
    let env = Env::load()?;
    let name = match name {
        Some(n) => n.to_string(),
        None => prompt::required("Service name")?,
    };

    println!("This permanently removes '{name}', its container, and its volumes.");
    let affirmed = prompt::confirm("Continue?")?;
    let typed_name = if affirmed {
        prompt::required(&format!("Type the service name ('{name}') to confirm"))?
    } else {
        String::new()
    };

    let lifecycle = Lifecycle::new(&env.registry, &env.runtime, &env.secrets, &env.config);
    lifecycle.remove(&name, &RemovalConfirmation { affirmed, typed_name })?;

    println!("✓ Removed '{name}'");
    Ok(())
}
