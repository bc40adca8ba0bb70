//! Environment files and the config merge engine.
//!
//! An `EnvSet` is an ordered set of `KEY=VALUE` pairs parsed from env-file
//! text. `merge` combines declared defaults with fetched secrets under
//! override precedence: secrets always win on key collision. Within a
//! single source file, the last occurrence of a duplicate key wins; this
//! is a deliberate determinism choice, not inherited ambiguity.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

/// Ordered key→value environment mapping. Keys are case-sensitive.
/// Insertion order is preserved so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvSet {
    entries: Vec<(String, String)>,
}

impl EnvSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse env-file text. Blank lines and lines starting with `#` are
    /// skipped; the first `=` splits key from value; lines without `=`
    /// are ignored. Duplicate keys within the text resolve last-wins.
    pub fn parse(text: &str) -> Self {
        let mut set = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            set.set(key, value.trim());
        }
        set
    }

    /// Insert or overwrite a key. Overwriting keeps the original position.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render back to env-file text, one `KEY=VALUE` per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

/// Merge declared defaults with fetched overrides. Overrides are taken
/// wholesale first so their keys win; defaults contribute only keys the
/// overrides do not carry.
pub fn merge(defaults: &EnvSet, overrides: &EnvSet) -> EnvSet {
    let mut merged = overrides.clone();
    for (key, value) in defaults.iter() {
        if !merged.contains_key(key) {
            merged.set(key, value);
        }
    }
    debug!(
        defaults = defaults.len(),
        overrides = overrides.len(),
        merged = merged.len(),
        "merged environment"
    );
    merged
}

/// Persist an env set with owner-only permissions. The temp file is
/// created mode 0600 in the destination directory before any bytes are
/// written, then renamed over the target, so the content is never
/// world-readable at any point.
pub fn write_env_file(path: &Path, env: &EnvSet) -> io::Result<()> {
    write_restricted(path, env.render().as_bytes())
}

/// Write bytes to `path` via a 0600 temp file and rename.
pub fn write_restricted(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    let tmp = dir.join(format!(
        ".{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "env".to_string())
    ));
    {
        let mut opts = fs::OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut file = opts.open(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}
