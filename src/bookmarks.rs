//! Bookmark persistence: a tiny key-value store plus the bookmark set kept in it.
//!
//! The store behaves like browser local storage: string values under string keys,
//! synchronous writes, last writer wins. The bookmark set is a JSON array of ids
//! under one namespaced key.

use std::{
  collections::{BTreeSet, HashMap},
  path::PathBuf,
  sync::{Arc, Mutex},
};

use tracing::{debug, instrument, warn};

use crate::error::StoreError;

pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Non-persistent store, used when no bookmark file is configured.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// One JSON object on disk mapping keys to string values.
/// The mutex serializes read-modify-write cycles within this process.
pub struct JsonFileStore {
  path: PathBuf,
  lock: Mutex<()>,
}

impl JsonFileStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), lock: Mutex::new(()) }
  }

  fn read_all(&self) -> Result<HashMap<String, String>, StoreError> {
    match std::fs::read_to_string(&self.path) {
      Ok(s) if s.trim().is_empty() => Ok(HashMap::new()),
      Ok(s) => Ok(serde_json::from_str(&s)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
      Err(source) => Err(StoreError::Io { path: self.path.clone(), source }),
    }
  }

  /// Write a sibling `.tmp` file and rename it over the store, so readers see
  /// either the old map or the new one.
  fn write_all(&self, all: &HashMap<String, String>) -> Result<(), StoreError> {
    let out = serde_json::to_string_pretty(all)?;
    let tmp = self.tmp_path();
    std::fs::write(&tmp, out).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
    std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io { path: self.path.clone(), source })
  }

  fn tmp_path(&self) -> PathBuf {
    let mut name = self.path.clone().into_os_string();
    name.push(".tmp");
    PathBuf::from(name)
  }
}

impl KeyValueStore for JsonFileStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
    Ok(self.read_all()?.remove(key))
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
    let mut all = self.read_all()?;
    all.insert(key.to_string(), value.to_string());
    self.write_all(&all)
  }
}

/// The bookmarked question ids, written through to the store on every change.
#[derive(Clone)]
pub struct Bookmarks {
  key: String,
  ids: BTreeSet<u32>,
  store: Arc<dyn KeyValueStore>,
}

impl Bookmarks {
  /// Read the set under `key`. Missing key means empty; unreadable content is
  /// logged and treated as empty.
  #[instrument(level = "debug", skip(store))]
  pub fn load(store: Arc<dyn KeyValueStore>, key: &str) -> Self {
    let ids = match store.get(key) {
      Ok(Some(raw)) => match serde_json::from_str::<Vec<u32>>(&raw) {
        Ok(v) => v.into_iter().collect(),
        Err(e) => {
          warn!(target: "session", %key, error = %e, "Stored bookmarks are unreadable; starting empty");
          BTreeSet::new()
        }
      },
      Ok(None) => BTreeSet::new(),
      Err(e) => {
        warn!(target: "session", %key, error = %e, "Bookmark store read failed; starting empty");
        BTreeSet::new()
      }
    };
    debug!(target: "session", %key, count = ids.len(), "Bookmarks loaded");
    Self { key: key.to_string(), ids, store }
  }

  pub fn contains(&self, id: u32) -> bool {
    self.ids.contains(&id)
  }

  pub fn ids(&self) -> Vec<u32> {
    self.ids.iter().copied().collect()
  }

  /// Flip membership and persist. Returns the new membership.
  /// A failed write is logged; the in-memory set keeps the toggle.
  pub fn toggle(&mut self, id: u32) -> bool {
    let now = if self.ids.remove(&id) {
      false
    } else {
      self.ids.insert(id);
      true
    };
    if let Err(e) = self.persist() {
      warn!(target: "session", key = %self.key, id, error = %e, "Failed to persist bookmarks");
    }
    now
  }

  fn persist(&self) -> Result<(), StoreError> {
    let raw = serde_json::to_string(&self.ids())?;
    self.store.set(&self.key, &raw)
  }
}
