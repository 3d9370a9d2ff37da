//! Secret service implementation.
//!
//! Reads API keys from `secret.json`. The `GEMINI_API_KEY` environment
//! variable takes precedence over the file.

use anyhow::{Context, Result};
use cerebro_core::config::SecretConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the Gemini key stored on disk.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Service for reading secret configuration.
///
/// # Example
///
/// ```ignore
/// use cerebro_infrastructure::SecretService;
///
/// let service = SecretService::new(paths.secret_file()?);
/// let api_key = service.gemini_api_key()?;
/// ```
#[derive(Debug, Clone)]
pub struct SecretService {
    path: PathBuf,
}

impl SecretService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn secret_file_exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads `secret.json`. A missing or empty file yields an empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_secrets(&self) -> Result<SecretConfig> {
        if !self.path.exists() {
            return Ok(SecretConfig::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(SecretConfig::default());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    /// Resolves the Gemini API key from the environment or `secret.json`.
    pub fn gemini_api_key(&self) -> Result<String> {
        let from_env = std::env::var(GEMINI_API_KEY_ENV).ok();
        let secrets = match from_env {
            // Skip the file entirely when the environment already answers.
            Some(ref key) if !key.trim().is_empty() => SecretConfig::default(),
            _ => self.load_secrets()?,
        };

        resolve_gemini_key(from_env, &secrets).with_context(|| {
            format!(
                "Gemini API key not found. Set {} or add {{\"gemini\": {{\"api_key\": \"...\"}}}} to {}",
                GEMINI_API_KEY_ENV,
                self.path.display()
            )
        })
    }
}

fn resolve_gemini_key(from_env: Option<String>, secrets: &SecretConfig) -> Option<String> {
    from_env
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .or_else(|| {
            secrets
                .gemini
                .as_ref()
                .map(|gemini| gemini.api_key.trim().to_string())
                .filter(|key| !key.is_empty())
        })
}
