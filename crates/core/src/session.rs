use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::domain::role::Role;

pub const PREFERRED_ROLE_KEY: &str = "preferred_role";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read session store `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not write session store `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("session store `{path}` is corrupt: {source}")]
    Corrupt { path: PathBuf, source: serde_json::Error },
}

/// Small string-keyed store for visitor preferences that survive restarts.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.remove(key);
        Ok(())
    }
}

/// JSON-file-backed store. Every operation reads the file fresh so concurrent
/// processes see each other's writes; the map is tiny, so this stays cheap.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new())
            }
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        serde_json::from_str(&raw)
            .map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let rendered = serde_json::to_string_pretty(entries)
            .map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })?;
        fs::write(&self.path, rendered)
            .map_err(|source| StoreError::Write { path: self.path.clone(), source })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

/// Role preference persisted across visits. Stores the lowercase storage value
/// and restores it leniently: unknown or corrupt values read back as the
/// default buyer role rather than failing the visit.
pub struct RoleStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> RoleStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn set_role(&self, role: Role) -> Result<(), StoreError> {
        self.store.set(PREFERRED_ROLE_KEY, role.storage_value())
    }

    pub fn current_role(&self) -> Result<Role, StoreError> {
        let raw = self.store.get(PREFERRED_ROLE_KEY)?;
        Ok(raw.as_deref().map(Role::parse_or_default).unwrap_or_default())
    }

    pub fn clear_role(&self) -> Result<(), StoreError> {
        self.store.remove(PREFERRED_ROLE_KEY)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
