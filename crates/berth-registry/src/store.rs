//! Registry — file-backed persistence for service records.
//!
//! One directory per service under `services/`, holding the compose
//! definition, the merged env file, and the JSON metadata record. The
//! metadata write uses write-temp-then-rename so a reader never observes
//! a half-written record. The registry is the single source of truth for
//! service existence; runtime container state is never consulted here.

use std::fs;
use std::path::Path;

use tracing::debug;

use berth_core::env::write_restricted;
use berth_core::paths::ConfigRoot;
use berth_core::types::ServiceRecord;

use crate::error::{RegistryError, RegistryResult};

/// Durable record store plus the per-service token files it owns.
#[derive(Clone)]
pub struct Registry {
    root: ConfigRoot,
}

impl Registry {
    /// Open a registry rooted at the given config root, creating the
    /// directory layout if needed.
    pub fn open(root: ConfigRoot) -> RegistryResult<Self> {
        root.ensure_layout()?;
        debug!(root = %root.root().display(), "registry opened");
        Ok(Self { root })
    }

    pub fn config_root(&self) -> &ConfigRoot {
        &self.root
    }

    /// List all registered service names, sorted.
    pub fn list(&self) -> RegistryResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.root.services_dir())? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            // A directory without a record is mid-write or mid-delete
            // residue, not a registered service.
            if self.root.record_path(&name).is_file() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.root.record_path(name).is_file()
    }

    /// Read one record.
    pub fn read(&self, name: &str) -> RegistryResult<ServiceRecord> {
        let path = self.root.record_path(name);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RegistryError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| RegistryError::Deserialize(e.to_string()))
    }

    /// Insert or update a record atomically (temp file + rename).
    pub fn write(&self, record: &ServiceRecord) -> RegistryResult<()> {
        let dir = self.root.service_dir(&record.name);
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| RegistryError::Serialize(e.to_string()))?;
        let path = self.root.record_path(&record.name);
        let tmp = dir.join(".service.json.tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &path)?;
        debug!(service = %record.name, "record stored");
        Ok(())
    }

    /// Delete a record and every artifact it owns: the service directory
    /// (compose file, env file, backups, metadata) and the token file.
    /// Calling this twice is a no-op, not an error.
    pub fn delete(&self, name: &str) -> RegistryResult<()> {
        let dir = self.root.service_dir(name);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        remove_if_present(&self.root.token_path(name))?;
        remove_if_present(&self.root.lock_path(name))?;
        debug!(service = name, "record and owned artifacts deleted");
        Ok(())
    }

    /// Find which active record, if any, already claims a hostname.
    /// `excluding` skips one name so upgrades don't collide with themselves.
    pub fn hostname_owner(
        &self,
        hostname: &str,
        excluding: Option<&str>,
    ) -> RegistryResult<Option<String>> {
        for name in self.list()? {
            if Some(name.as_str()) == excluding {
                continue;
            }
            let record = self.read(&name)?;
            if record.hostname == hostname {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    /// Enforce the hostname-uniqueness invariant.
    pub fn check_hostname_free(
        &self,
        hostname: &str,
        excluding: Option<&str>,
    ) -> RegistryResult<()> {
        match self.hostname_owner(hostname, excluding)? {
            Some(owner) => Err(RegistryError::HostnameTaken(hostname.to_string(), owner)),
            None => Ok(()),
        }
    }

    // ── Token store ────────────────────────────────────────────────

    /// Persist a service's secret token with owner-only permissions.
    pub fn store_token(&self, name: &str, token: &str) -> RegistryResult<()> {
        write_restricted(&self.root.token_path(name), token.trim().as_bytes())?;
        Ok(())
    }

    /// Read a stored token. None when the service has no managed token.
    pub fn read_token(&self, name: &str) -> RegistryResult<Option<String>> {
        match fs::read_to_string(self.root.token_path(name)) {
            Ok(s) => Ok(Some(s.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
