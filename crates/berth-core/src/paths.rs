//! Centralized filesystem layout for berth state.
//!
//! All persisted paths go through `ConfigRoot` so every crate agrees on
//! where things live. Nothing here touches the "current directory";
//! operations receive an explicit root.
//!
//! Layout under the root:
//!
//! ```text
//! berth.toml                  global settings
//! services/<name>/compose.yaml
//! services/<name>/.env
//! services/<name>/defaults.env
//! services/<name>/service.json
//! tokens/<name>.token         dir 0700, files 0600
//! proxy/compose.yaml          proxy bring-up
//! proxy/traefik.yaml          proxy static config
//! locks/<name>.lock           advisory operation locks
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config root location.
pub const ROOT_ENV: &str = "BERTH_ROOT";

/// Root of all berth state on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    root: PathBuf,
}

impl ConfigRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the default root: `$BERTH_ROOT` if set, otherwise
    /// `~/.berth`, falling back to `.berth` when no home is known.
    pub fn resolve() -> Self {
        if let Ok(dir) = std::env::var(ROOT_ENV) {
            return Self::new(dir);
        }
        let home = std::env::var_os("HOME").map(PathBuf::from);
        match home {
            Some(h) => Self::new(h.join(".berth")),
            None => Self::new(".berth"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("berth.toml")
    }

    pub fn services_dir(&self) -> PathBuf {
        self.root.join("services")
    }

    pub fn service_dir(&self, name: &str) -> PathBuf {
        self.services_dir().join(name)
    }

    pub fn compose_path(&self, name: &str) -> PathBuf {
        self.service_dir(name).join("compose.yaml")
    }

    pub fn env_path(&self, name: &str) -> PathBuf {
        self.service_dir(name).join(".env")
    }

    pub fn env_backup_path(&self, name: &str) -> PathBuf {
        self.service_dir(name).join(".env.bak")
    }

    pub fn defaults_path(&self, name: &str) -> PathBuf {
        self.service_dir(name).join("defaults.env")
    }

    pub fn record_path(&self, name: &str) -> PathBuf {
        self.service_dir(name).join("service.json")
    }

    pub fn tokens_dir(&self) -> PathBuf {
        self.root.join("tokens")
    }

    pub fn token_path(&self, name: &str) -> PathBuf {
        self.tokens_dir().join(format!("{name}.token"))
    }

    pub fn proxy_dir(&self) -> PathBuf {
        self.root.join("proxy")
    }

    pub fn proxy_compose_path(&self) -> PathBuf {
        self.proxy_dir().join("compose.yaml")
    }

    pub fn proxy_static_path(&self) -> PathBuf {
        self.proxy_dir().join("traefik.yaml")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn lock_path(&self, name: &str) -> PathBuf {
        self.locks_dir().join(format!("{name}.lock"))
    }

    /// Create the top-level directories. The token directory is created
    /// owner-only since every file under it is a credential.
    pub fn ensure_layout(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.services_dir())?;
        std::fs::create_dir_all(self.proxy_dir())?;
        std::fs::create_dir_all(self.locks_dir())?;
        std::fs::create_dir_all(self.tokens_dir())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                self.tokens_dir(),
                std::fs::Permissions::from_mode(0o700),
            )?;
        }
        Ok(())
    }
}
