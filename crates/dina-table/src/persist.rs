//! Persisted list-page state.
//!
//! A list page remembers its filter, page size and sort between visits. The
//! state is stored as JSON under a key derived from the list's id, in a
//! string key-value store with no expiry.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dina_filter::FilterModel;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TableConfig;
use crate::error::Error;
use crate::sort::SortColumn;

/// What a list page remembers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPageState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortColumn>,
}

impl ListPageState {
    /// Apply the remembered page size and sort to a table configuration.
    pub fn apply_to(&self, mut config: TableConfig) -> TableConfig {
        if let Some(size) = self.page_size {
            config.default_page_size = size;
        }
        if !self.sort.is_empty() {
            config.default_sort = self.sort.clone();
        }
        config
    }
}

/// A string key-value store.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;
    fn set(&self, key: &str, value: String) -> Result<(), Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Store key of a list's state.
pub fn state_key(list_id: &str) -> String {
    format!("{list_id}_list_state")
}

/// Read a list's state.
///
/// State that no longer decodes is treated as absent.
pub fn load_list_state(
    store: &dyn StateStore,
    list_id: &str,
) -> Result<Option<ListPageState>, Error> {
    let Some(raw) = store.get(&state_key(list_id))? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            warn!(list_id, error = %e, "ignoring undecodable list state");
            Ok(None)
        }
    }
}

/// Write a list's state.
pub fn save_list_state(
    store: &dyn StateStore,
    list_id: &str,
    state: &ListPageState,
) -> Result<(), Error> {
    let raw = serde_json::to_string(state)?;
    debug!(list_id, "saving list state");
    store.set(&state_key(list_id), raw)
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), Error> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object in a file.
///
/// The file is read on every access and rewritten on every change, so
/// several processes can share it as long as they do not write at once.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, Error> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), Error> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
