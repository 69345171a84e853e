//! Key-value persistence adapter.
//!
//! Stores hold opaque string values under fixed keys. [`FileStore`] keeps one
//! file per key with file locking and atomic replacement; [`MemoryStore`] is
//! the in-process substitute used by tests.

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Storage key for the workout archive
pub const ARCHIVE_KEY: &str = "aura-kinetic-archives";
/// Storage key for the daily schedule
pub const SCHEDULE_KEY: &str = "aura-tasks";
/// Storage key for the health ecosystem link
pub const HEALTH_LINK_KEY: &str = "aura-health-link";

/// Synchronous string key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Read and deserialize a JSON value. `Ok(None)` when the key is absent.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        None => Ok(None),
    }
}

/// Serialize a value as compact JSON and store it
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let contents = serde_json::to_string(value)?;
    store.set(key, &contents)
}

// ============================================================================
// Persisted JSON list
// ============================================================================

/// Mutation replayed onto the stored list once it becomes readable
type Replay<T> = Box<dyn Fn(&mut Vec<T>)>;

/// A JSON array held under one key with read-modify-write semantics.
///
/// Before each mutation the persisted array is re-read and adopted, so
/// writes from other instances survive (last writer wins). A failed write
/// is non-fatal: the in-memory items stay authoritative, re-reads are
/// suspended, and the write is retried on the next mutation.
///
/// Stored data that exists but cannot be read is never overwritten. Until a
/// read succeeds, mutations are applied in memory only and journaled; the
/// journal is replayed onto the stored list when it first loads. A blob that
/// reads fine but does not parse counts as read and may be replaced.
pub struct JsonList<T, S: KeyValueStore> {
    store: S,
    key: &'static str,
    items: Vec<T>,
    pending_write: bool,
    loaded: bool,
    journal: Vec<Replay<T>>,
}

impl<T, S> JsonList<T, S>
where
    T: Serialize + DeserializeOwned + 'static,
    S: KeyValueStore,
{
    /// Load the list, falling back to `seed` when nothing is stored yet and
    /// to an empty list when the stored data cannot be used.
    pub fn open_or_else<F>(store: S, key: &'static str, seed: F) -> Self
    where
        F: FnOnce() -> Vec<T>,
    {
        let (items, loaded) = match load_json::<Vec<T>, _>(&store, key) {
            Ok(Some(items)) => {
                tracing::debug!("Loaded {} items from {}", items.len(), key);
                (items, true)
            }
            Ok(None) => (seed(), true),
            Err(Error::Json(e)) => {
                tracing::warn!("Discarding corrupt {}: {}. Starting empty.", key, e);
                (Vec::new(), true)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read {}: {}. Changes stay in memory until it is readable.",
                    key,
                    e
                );
                (Vec::new(), false)
            }
        };

        Self {
            store,
            key,
            items,
            pending_write: false,
            loaded,
            journal: Vec::new(),
        }
    }

    pub fn open(store: S, key: &'static str) -> Self {
        Self::open_or_else(store, key, Vec::new)
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// True while some change has not reached storage
    pub fn has_pending_write(&self) -> bool {
        self.pending_write || !self.journal.is_empty()
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Apply a mutation on top of the freshest persisted state, then persist.
    ///
    /// Nothing is written when `f` reports that it changed nothing, unless
    /// an earlier write is still pending. `f` may run again later if the
    /// stored list was unreadable when it was first applied.
    pub fn mutate<R, F>(&mut self, f: F) -> R
    where
        F: Fn(&mut Vec<T>) -> (R, bool) + 'static,
    {
        self.refresh();
        let (result, changed) = f(&mut self.items);

        if !self.loaded {
            if changed {
                tracing::debug!("Holding change to unreadable {} in memory", self.key);
                self.journal.push(Box::new(move |items| {
                    f(items);
                }));
            }
            return result;
        }

        if changed || self.pending_write {
            self.persist();
        }
        result
    }

    fn refresh(&mut self) {
        if self.loaded && self.pending_write {
            return;
        }
        match load_json::<Vec<T>, _>(&self.store, self.key) {
            Ok(Some(items)) => {
                self.items = items;
                self.replay_journal();
            }
            Ok(None) if !self.loaded => {
                self.items.clear();
                self.replay_journal();
            }
            Ok(None) => {}
            Err(Error::Json(e)) if !self.loaded => {
                tracing::warn!("Replacing corrupt {}: {}", self.key, e);
                self.items.clear();
                self.replay_journal();
            }
            Err(e) => tracing::warn!("Could not re-read {}: {}", self.key, e),
        }
    }

    /// Re-apply changes made while the stored list was unreadable
    fn replay_journal(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        if self.journal.is_empty() {
            return;
        }
        tracing::info!(
            "Merging {} held change(s) into {}",
            self.journal.len(),
            self.key
        );
        for replay in self.journal.drain(..) {
            replay(&mut self.items);
        }
        self.pending_write = true;
    }

    fn persist(&mut self) {
        match save_json(&mut self.store, self.key, &self.items) {
            Ok(()) => {
                if self.pending_write {
                    tracing::info!("Pending write to {} succeeded", self.key);
                }
                self.pending_write = false;
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to persist {}: {}. Will retry on next change.",
                    self.key,
                    e
                );
                self.pending_write = true;
            }
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `PersistenceUnavailable` until reset
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.unavailable {
            return Err(Error::persistence(key, "store offline"));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.check(key)?;
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.check(key)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check(key)?;
        self.values.remove(key);
        Ok(())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// One `<key>.json` file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Validation(format!("invalid storage key {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path).map_err(|e| Error::persistence(key, e))?;
        // Acquire shared lock for reading
        file.lock_shared().map_err(|e| Error::persistence(key, e))?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        let _ = file.unlock();
        read.map_err(|e| Error::persistence(key, e))?;

        tracing::debug!("Read {} bytes from {:?}", contents.len(), path);
        Ok(Some(contents))
    }

    /// Atomically replaces the value: temp file in the same directory,
    /// exclusive lock, fsync, rename over the original.
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::persistence(key, e))?;

        let temp = NamedTempFile::new_in(&self.dir).map_err(|e| Error::persistence(key, e))?;
        temp.as_file()
            .lock_exclusive()
            .map_err(|e| Error::persistence(key, e))?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer
                .write_all(value.as_bytes())
                .and_then(|_| writer.flush())
                .map_err(|e| Error::persistence(key, e))?;
        }

        temp.as_file()
            .sync_all()
            .map_err(|e| Error::persistence(key, e))?;
        let _ = temp.as_file().unlock();

        temp.persist(&path)
            .map_err(|e| Error::persistence(key, e.error))?;

        tracing::debug!("Saved {} to {:?}", key, path);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        assert_eq!(store.get("aura-tasks").unwrap(), None);
        store.set("aura-tasks", "[1,2,3]").unwrap();
        assert_eq!(store.get("aura-tasks").unwrap().as_deref(), Some("[1,2,3]"));

        store.set("aura-tasks", "[]").unwrap();
        assert_eq!(store.get("aura-tasks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_store_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let mut store = FileStore::new(&nested);

        store.set("key", "value").unwrap();
        assert!(nested.join("key.json").exists());
    }

    #[test]
    fn test_file_store_remove() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());

        store.set("link", "healthkit").unwrap();
        store.remove("link").unwrap();
        assert_eq!(store.get("link").unwrap(), None);

        // Absent key
        store.remove("link").unwrap();
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());
        store.set("archive", "[]").unwrap();
        store.set("archive", "[{}]").unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "archive.json")
            .collect();
        assert!(extras.is_empty(), "unexpected files: {:?}", extras);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let store = FileStore::new("/tmp");
        assert!(matches!(
            store.get("../escape"),
            Err(Error::Validation(_))
        ));
        assert!(store.path_for("").is_err());
    }

    #[test]
    fn test_file_store_write_failure_is_persistence_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        // A regular file where the data directory should be
        let blocker = temp_dir.path().join("blocked");
        std::fs::write(&blocker, "x").unwrap();

        let mut store = FileStore::new(&blocker);
        let err = store.set("key", "value").unwrap_err();
        assert!(matches!(err, Error::PersistenceUnavailable(_)));
    }

    #[test]
    fn test_memory_store_unavailable() {
        let mut store = MemoryStore::new();
        store.set("k", "v").unwrap();

        store.set_unavailable(true);
        assert!(matches!(store.get("k"), Err(Error::PersistenceUnavailable(_))));
        assert!(store.set("k", "w").is_err());

        store.set_unavailable(false);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_json_helpers() {
        let mut store = MemoryStore::new();
        assert_eq!(load_json::<Vec<u32>, _>(&store, "nums").unwrap(), None);

        save_json(&mut store, "nums", &vec![1u32, 2, 3]).unwrap();
        let nums: Option<Vec<u32>> = load_json(&store, "nums").unwrap();
        assert_eq!(nums, Some(vec![1, 2, 3]));

        store.set("nums", "not json").unwrap();
        assert!(matches!(
            load_json::<Vec<u32>, _>(&store, "nums"),
            Err(Error::Json(_))
        ));
    }
}
