use super::settings::{Settings, SETTINGS_KEY};
use crate::error::ChatError;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Durable key-value storage for client-side records.
pub trait SettingsStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ChatError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SettingsStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging, value)?;
        fs::rename(&staging, &target)?;
        debug!(path = %target.display(), "settings written");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads and saves the [`Settings`] record through a storage backend.
#[derive(Clone)]
pub struct ConfigStore {
    storage: Arc<dyn SettingsStorage>,
}

impl ConfigStore {
    pub fn new(storage: impl SettingsStorage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Returns the persisted settings, or defaults when the record is absent,
    /// unreadable or malformed.
    pub fn load(&self) -> Settings {
        let raw = match self.storage.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Settings::default(),
            Err(error) => {
                warn!(%error, "could not read stored settings; using defaults");
                return Settings::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(error) => {
                warn!(%error, "stored settings are malformed; using defaults");
                Settings::default()
            }
        }
    }

    /// Replaces the stored record with `settings`.
    pub fn save(&self, settings: &Settings) -> Result<(), ChatError> {
        let raw = serde_json::to_string(settings)
            .map_err(|error| ChatError::Storage(format!("cannot encode settings: {error}")))?;
        self.storage.set(SETTINGS_KEY, &raw)
    }
}
