//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml`, creating the file with
//! default values when it does not exist yet.

use crate::storage::{load_toml, save_toml};
use cerebro_core::config::RootConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// Never fails: unreadable or malformed files fall back to defaults.
    pub fn get_config(&self) -> RootConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = self.load_config();

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    fn load_config(&self) -> RootConfig {
        match load_toml::<RootConfig>(&self.path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                let default_config = RootConfig::default();
                if let Err(e) = save_toml(&self.path, &default_config) {
                    tracing::warn!("[ConfigService] Failed to write default config: {:#}", e);
                } else {
                    tracing::info!("[ConfigService] Created default config at {}", self.path.display());
                }
                default_config
            }
            Err(e) => {
                tracing::warn!("[ConfigService] {:#}. Using defaults", e);
                RootConfig::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let service = ConfigService::new(&path);

        let config = service.get_config();

        assert_eq!(config, RootConfig::default());
        assert!(path.exists());
        let written: RootConfig = toml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, config);
    }

    #[test]
    fn test_existing_values_are_used() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "model = \"gemini-1.5-pro\"\nsession_limit = 3\n").unwrap();

        let config = ConfigService::new(&path).get_config();

        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.session_limit, 3);
        assert_eq!(config.save_debounce_ms, 300);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "session_limit = \"many\"").unwrap();

        let config = ConfigService::new(&path).get_config();

        assert_eq!(config, RootConfig::default());
        // The broken file is left for the user to fix.
        assert_eq!(fs::read_to_string(&path).unwrap(), "session_limit = \"many\"");
    }

    #[test]
    fn test_cache_and_invalidate() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let service = ConfigService::new(&path);
        assert_eq!(service.get_config().session_limit, 10);

        fs::write(&path, "session_limit = 4\n").unwrap();
        assert_eq!(service.get_config().session_limit, 10);

        service.invalidate_cache();
        assert_eq!(service.get_config().session_limit, 4);
    }
}
