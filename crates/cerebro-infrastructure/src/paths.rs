//! Unified path management for cerebro files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/cerebro/           # Config directory
//! ├── config.toml              # Application configuration
//! └── secret.json              # API keys
//!
//! ~/.local/share/cerebro/      # Data directory
//! ├── store/                   # Key-value storage medium (chats.json, activeChat.json)
//! └── logs/                    # Application logs
//!     └── cerebro.log.YYYY-MM-DD
//! ```
//!
//! With an explicit base directory (`--home`), config files live directly in
//! the base directory and data directories beneath it.

use std::path::{Path, PathBuf};

const APP_NAME: &str = "cerebro";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config/data directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves every file location used by cerebro.
#[derive(Debug, Clone)]
pub struct CerebroPaths {
    base: Option<PathBuf>,
}

impl CerebroPaths {
    /// Creates a resolver using platform directories, or `base` when given.
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_NAME))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_NAME))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Returns the path to the main configuration file.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    /// Returns the directory backing the key-value storage medium.
    pub fn store_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("store"))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("logs"))
    }
}

impl Default for CerebroPaths {
    fn default() -> Self {
        Self::new(None)
    }
}
