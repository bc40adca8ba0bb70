//! Advisory per-service operation locks.
//!
//! Berth assumes a single operator running one lifecycle operation at a
//! time per service. The lock exists to fail fast with a clear error if
//! that assumption is violated, not to serialize concurrent work.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use berth_core::paths::ConfigRoot;

use crate::error::{RegistryError, RegistryResult};

/// Holds the lock file for one service; removed on drop.
pub struct OperationLock {
    path: PathBuf,
    name: String,
}

impl OperationLock {
    /// Acquire the lock for a service name. Fails immediately with
    /// [`RegistryError::Locked`] if another operation holds it.
    pub fn acquire(root: &ConfigRoot, name: &str) -> RegistryResult<Self> {
        std::fs::create_dir_all(root.locks_dir())?;
        let path = root.lock_path(name);
        let result = OpenOptions::new().write(true).create_new(true).open(&path);
        match result {
            Ok(mut file) => {
                let _ = writeln!(file, "pid={}", std::process::id());
                debug!(service = name, "operation lock acquired");
                Ok(Self {
                    path,
                    name: name.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(RegistryError::Locked(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for OperationLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(service = %self.name, error = %e, "failed to release operation lock");
            }
        }
    }
}
