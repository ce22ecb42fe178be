//! Key-value persistence, the local-storage analog. One blocking synchronous
//! write per mutation, last write wins.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::Error;

/// Minimal string key-value store, mirroring the `getItem`/`setItem`/
/// `removeItem` surface the browser tool persisted through.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), Error>;
    fn remove(&mut self, key: &str) -> Result<(), Error>;
}

/// In-memory store for tests and the wasm host, which round-trips the blob
/// through real local storage itself.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key under a directory.
/// Writes go to a temp file first and are renamed into place.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| Error::Store(format!("Failed to read {}: {e}", path.display())))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Error> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Store(format!("Failed to create {}: {e}", self.dir.display())))?;

        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let path = self.path(key);
        fs::write(&tmp, value)
            .map_err(|e| Error::Store(format!("Failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Store(format!("Failed to rename {}: {e}", path.display())))?;

        tracing::debug!(key, bytes = value.len(), "store flush");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| Error::Store(format!("Failed to remove {}: {e}", path.display())))?;
        }
        Ok(())
    }
}
