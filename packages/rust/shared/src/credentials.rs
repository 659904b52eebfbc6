//! API credential persistence.
//!
//! Credentials live in `~/.glimpse/credentials.toml` as a flat key/value table,
//! separate from the main config so the config can be shared safely.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::config_dir;
use crate::error::{GlimpseError, Result};

/// Default credentials file name.
const CREDENTIALS_FILE_NAME: &str = "credentials.toml";

/// Get/set access to stored credentials.
pub trait CredentialStore: Send + Sync {
    /// Look up a credential. `Ok(None)` when it was never stored.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Persist a credential, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// TOML-file backed credential store.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store backed by `~/.glimpse/credentials.toml`.
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(config_dir()?.join(CREDENTIALS_FILE_NAME)))
    }

    /// Store backed by an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| GlimpseError::io(&self.path, e))?;
        toml::from_str(&content).map_err(|e| {
            GlimpseError::Credential(format!("failed to parse {}: {e}", self.path.display()))
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .read_table()?
            .remove(key)
            .filter(|value| !value.is_empty()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut table = self.read_table()?;
        table.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GlimpseError::io(parent, e))?;
        }
        let content = toml::to_string(&table)
            .map_err(|e| GlimpseError::Credential(format!("failed to serialize: {e}")))?;
        write_private(&self.path, &content).map_err(|e| GlimpseError::io(&self.path, e))?;

        tracing::info!(path = ?self.path, key, "stored credential");
        Ok(())
    }
}

/// Write `content`, truncating, with owner-only permissions on unix.
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; tighten files left by older versions.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content.as_bytes())
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

/// Process-local credential store, for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| GlimpseError::Credential("credential store poisoned".into()))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| GlimpseError::Credential("credential store poisoned".into()))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
