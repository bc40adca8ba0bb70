//! Docker CLI adapter.
//!
//! Everything the lifecycle needs from the container runtime goes through
//! the [`ContainerRuntime`] trait; the real implementation shells out to
//! `docker compose` / `docker` and never reaches into a running process.
//! Compose files are addressed by absolute path, never via the current
//! directory.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::compose::MANAGED_LABEL;
use crate::error::{RuntimeError, RuntimeResult};

/// Snapshot of one container as reported by `docker inspect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    /// Runtime state: "running", "exited", "restarting", ...
    pub state: String,
    /// Health probe verdict, when the image defines one.
    pub health: Option<String>,
    /// Image reference the container was created from.
    pub image: String,
    /// RFC 3339 start time.
    pub started_at: Option<String>,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// Narrow interface over the container runtime.
pub trait ContainerRuntime {
    /// `docker compose up -d` against a service's compose file.
    fn up(&self, compose_file: &Path) -> RuntimeResult<()>;
    /// `docker compose down`, optionally removing volumes.
    fn down(&self, compose_file: &Path, remove_volumes: bool) -> RuntimeResult<()>;
    /// `docker compose pull`.
    fn pull(&self, compose_file: &Path) -> RuntimeResult<()>;
    /// `docker compose restart`.
    fn restart(&self, compose_file: &Path) -> RuntimeResult<()>;
    /// Last `tail` log lines for the composed service.
    fn logs(&self, compose_file: &Path, tail: u32) -> RuntimeResult<String>;
    /// Inspect one container by name. None when it does not exist.
    fn inspect(&self, container: &str) -> RuntimeResult<Option<ContainerStatus>>;
    /// Service names of all berth-labelled containers, running or not.
    fn list_managed(&self) -> RuntimeResult<Vec<String>>;
    /// Create the shared network if it does not exist yet.
    fn ensure_network(&self, name: &str) -> RuntimeResult<()>;
}

/// Shell-out implementation of [`ContainerRuntime`].
#[derive(Debug, Clone, Default)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        Self
    }

    /// Check that the docker CLI is present and the daemon answers.
    pub fn available(&self) -> RuntimeResult<()> {
        let output = Command::new("docker")
            .args(["version", "--format", "{{.Server.Version}}"])
            .output()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(RuntimeError::Unavailable(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }

    fn compose(&self, compose_file: &Path, args: &[&str]) -> RuntimeResult<String> {
        let mut cmd = Command::new("docker");
        cmd.arg("compose")
            .arg("-f")
            .arg(compose_file)
            .args(args);
        run(cmd, &format!("compose {}", args.join(" ")))
    }
}

fn run(mut cmd: Command, describe: &str) -> RuntimeResult<String> {
    debug!(command = describe, "invoking docker");
    let output = cmd
        .output()
        .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(RuntimeError::CommandFailed {
            command: describe.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl ContainerRuntime for DockerCli {
    fn up(&self, compose_file: &Path) -> RuntimeResult<()> {
        self.compose(compose_file, &["up", "-d"]).map(|_| ())
    }

    fn down(&self, compose_file: &Path, remove_volumes: bool) -> RuntimeResult<()> {
        let args: &[&str] = if remove_volumes {
            &["down", "--volumes"]
        } else {
            &["down"]
        };
        self.compose(compose_file, args).map(|_| ())
    }

    fn pull(&self, compose_file: &Path) -> RuntimeResult<()> {
        self.compose(compose_file, &["pull"]).map(|_| ())
    }

    fn restart(&self, compose_file: &Path) -> RuntimeResult<()> {
        self.compose(compose_file, &["restart"]).map(|_| ())
    }

    fn logs(&self, compose_file: &Path, tail: u32) -> RuntimeResult<String> {
        let tail = tail.to_string();
        self.compose(compose_file, &["logs", "--no-color", "--tail", &tail])
    }

    fn inspect(&self, container: &str) -> RuntimeResult<Option<ContainerStatus>> {
        let mut cmd = Command::new("docker");
        cmd.args(["inspect", container]);
        let output = cmd
            .output()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        if !output.status.success() {
            // "No such object" is an expected answer, not a failure.
            return Ok(None);
        }
        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| RuntimeError::Parse(e.to_string()))?;
        let Some(first) = parsed.as_array().and_then(|a| a.first()) else {
            return Ok(None);
        };
        Ok(Some(status_from_inspect(first)?))
    }

    fn list_managed(&self) -> RuntimeResult<Vec<String>> {
        let mut cmd = Command::new("docker");
        cmd.args([
            "ps",
            "-a",
            "--filter",
            &format!("label={MANAGED_LABEL}"),
            "--format",
            &format!("{{{{.Label \"{MANAGED_LABEL}\"}}}}"),
        ]);
        let stdout = run(cmd, "ps (managed containers)")?;
        let mut names: Vec<String> = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn ensure_network(&self, name: &str) -> RuntimeResult<()> {
        let exists = Command::new("docker")
            .args(["network", "inspect", name])
            .output()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        if exists.status.success() {
            return Ok(());
        }
        let mut cmd = Command::new("docker");
        cmd.args(["network", "create", name]);
        run(cmd, &format!("network create {name}")).map(|_| ())
    }
}

/// Pull the fields we care about out of one `docker inspect` object.
fn status_from_inspect(value: &serde_json::Value) -> RuntimeResult<ContainerStatus> {
    let state = &value["State"];
    let status = state["Status"]
        .as_str()
        .ok_or_else(|| RuntimeError::Parse("missing State.Status".to_string()))?;
    Ok(ContainerStatus {
        state: status.to_string(),
        health: state["Health"]["Status"].as_str().map(str::to_string),
        image: value["Config"]["Image"].as_str().unwrap_or("").to_string(),
        started_at: state["StartedAt"].as_str().map(str::to_string),
    })
}
