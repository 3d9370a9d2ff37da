//! Durable key-value storage medium.
//!
//! The core only needs synchronous get/set/remove by string key. The file
//! backed implementation lives in `cerebro-infrastructure`; [`MemoryStorage`]
//! is used by tests and as a fallback when no data directory is available.

use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Storage key holding the serialized session collection.
pub const CHATS_KEY: &str = "chats";
/// Storage key holding the active session id.
pub const ACTIVE_CHAT_KEY: &str = "activeChat";

/// A synchronous string key-value store that survives process restarts.
pub trait KeyValueStorage: Send + Sync {
    /// Reads a value.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: Key present
    /// - `Ok(None)`: Key absent
    /// - `Err(_)`: The medium could not be read
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a key. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process storage that records how many writes each key received.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    writes: HashMap<String, usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls observed for `key`.
    pub fn write_count(&self, key: &str) -> usize {
        self.lock().writes.get(key).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.values.insert(key.to_string(), value.to_string());
        *inner.writes.entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().values.remove(key);
        Ok(())
    }
}
