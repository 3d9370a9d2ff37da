//! Typed TOML files replaced atomically on save.

use super::atomic_file::write_atomic;
use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::io;
use std::path::Path;

/// Reads and parses a TOML file.
///
/// # Returns
///
/// - `Ok(Some(value))`: File parsed
/// - `Ok(None)`: File missing or blank
/// - `Err(_)`: File unreadable or not valid for `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    if content.trim().is_empty() {
        return Ok(None);
    }

    toml::from_str(&content)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Serializes `value` as pretty TOML and atomically replaces `path`.
pub fn save_toml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let rendered = toml::to_string_pretty(value).context("Failed to serialize TOML")?;
    write_atomic(path, rendered.as_bytes()).with_context(|| format!("Failed to write {}", path.display()))
}
