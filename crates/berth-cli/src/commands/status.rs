//! `berth status` — read-only overview of services and proxy.

use berth_core::types::ServiceState;
use berth_lifecycle::Lifecycle;

use super::Env;

pub fn run() -> anyhow::Result<()> {
    let env = Env::load()?;
    let lifecycle = Lifecycle::new(&env.registry, &env.runtime, &env.secrets, &env.config);
    let report = lifecycle.status()?;

    match &report.proxy.container {
        Some(state) => println!("proxy: {state}"),
        None => println!("proxy: not found — run `berth init` to bring it up"),
    }

    if report.services.is_empty() {
        println!("No services registered.");
    } else {
        println!(
            "{:<16} {:<28} {:>6}  {:<10} {}",
            "NAME", "HOSTNAME", "PORT", "STATE", "HEALTH"
        );
        for svc in &report.services {
            let state = match svc.state {
                ServiceState::Running => "running",
                ServiceState::Stopped => "stopped",
                ServiceState::Registered => "not found",
                ServiceState::Absent => "absent",
                ServiceState::Removing => "removing",
            };
            println!(
                "{:<16} {:<28} {:>6}  {:<10} {}",
                svc.name,
                svc.hostname,
                svc.port,
                state,
                svc.health.as_deref().unwrap_or("-"),
            );
        }
    }

    for orphan in &report.orphans {
        println!("⚠ container '{orphan}' is berth-labelled but has no record — remove it or re-register");
    }
    Ok(())
}
