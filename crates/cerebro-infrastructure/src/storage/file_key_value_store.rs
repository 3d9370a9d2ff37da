//! File-backed key-value storage medium.
//!
//! Each key maps to `<dir>/<key>.json`. Writes are atomic and serialized
//! across processes by a per-key lock file.

use super::atomic_file::{FileLock, write_atomic};
use cerebro_core::error::{CerebroError, Result};
use cerebro_core::storage::KeyValueStorage;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Stores each key as a JSON file inside a single directory.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            CerebroError::storage(format!("Failed to create store directory {}: {}", dir.display(), e))
        })?;
        tracing::debug!("[FileKeyValueStore] Using {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

/// Keys become file names, so only `[A-Za-z0-9_-]` is accepted.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CerebroError::storage(format!("Invalid storage key: {:?}", key)))
    }
}

impl KeyValueStorage for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CerebroError::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let _lock = FileLock::acquire(&path)?;
        write_atomic(&path, value.as_bytes()).map_err(|e| {
            CerebroError::storage(format!("Failed to write {}: {}", path.display(), e))
        })?;
        tracing::trace!("[FileKeyValueStore] Wrote {} ({} bytes)", key, value.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let _lock = FileLock::acquire(&path)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CerebroError::storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
