//! Durable credential persistence
//!
//! The access token and the cookie-carried refresh credential outlive a
//! single process. This module stores them under fixed keys through the
//! [`CredentialStore`] trait, which has three backends:
//!
//! - [`KeyringStore`] -- the operating system's native credential store
//!   (Keychain on macOS, Secret Service on Linux, Credential Manager on
//!   Windows).
//! - [`FileStore`] -- a JSON file in the platform data directory, for
//!   headless machines without a keyring daemon.
//! - [`MemoryStore`] -- process-local, used by tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::{CredentialBackend, CredentialsConfig};
use crate::error::{CmdStashError, Result};

/// Key of the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Key of the refresh cookie header value.
pub const REFRESH_COOKIE_KEY: &str = "refreshCookie";

/// Key/value persistence for credentials.
///
/// Implementations must treat a missing key as `Ok(None)` on load and as a
/// no-op on delete.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync + std::fmt::Debug {
    /// Loads the value stored under `key`.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Builds the store selected by the configuration.
///
/// # Errors
///
/// Returns [`CmdStashError::CredentialStorage`] when the file backend is
/// selected and no data directory can be determined.
pub fn from_config(config: &CredentialsConfig) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.backend {
        CredentialBackend::Keyring => Arc::new(KeyringStore::new(&config.service)),
        CredentialBackend::File => {
            let path = match &config.path {
                Some(path) => PathBuf::from(path),
                None => FileStore::default_path()?,
            };
            Arc::new(FileStore::new(path))
        }
        CredentialBackend::Memory => Arc::new(MemoryStore::default()),
    };
    tracing::debug!("Using {:?} credential store", config.backend);
    Ok(store)
}

// ---------------------------------------------------------------------------
// KeyringStore
// ---------------------------------------------------------------------------

/// Accessor for the OS native keyring.
///
/// Each key is an entry of the configured service name, so several
/// deployments can coexist by using different service names.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Creates a store namespaced under `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, key).map_err(CmdStashError::Keyring)?)
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CmdStashError::Keyring(e).into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(CmdStashError::Keyring)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CmdStashError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// JSON file of key/value pairs.
///
/// The whole file is rewritten on every change. On Unix the file is created
/// with mode `0600`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<data dir>/cmdstash/credentials.json`.
    ///
    /// # Errors
    ///
    /// Returns [`CmdStashError::CredentialStorage`] when the platform has no
    /// home directory.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "cmdstash").ok_or_else(|| {
            CmdStashError::CredentialStorage("could not determine a data directory".to_string())
        })?;
        Ok(dirs.data_dir().join("credentials.json"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            CmdStashError::CredentialStorage(format!(
                "corrupt credential file {}: {}",
                self.path.display(),
                e
            ))
            .into()
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| {
            CmdStashError::CredentialStorage("credential file lock poisoned".to_string()).into()
        })
    }
}

impl CredentialStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| {
            CmdStashError::CredentialStorage("memory store lock poisoned".to_string()).into()
        })
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
