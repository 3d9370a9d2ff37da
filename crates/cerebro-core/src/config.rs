//! Root configuration model.
//!
//! Loaded from `config.toml` by the infrastructure `ConfigService`. Every
//! field has a default so a partial (or missing) file still yields a usable
//! configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Gemini model used for completions.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
/// Default base URL of the Gemini `generateContent` endpoints.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Hard cap on concurrently stored sessions.
pub const DEFAULT_SESSION_LIMIT: usize = 10;
/// Quiet period before the session collection is written.
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 300;
/// Upper bound on a single completion request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RootConfig {
    /// Model identifier sent with every completion request
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the completion API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Maximum number of sessions kept at once
    #[serde(default = "default_session_limit")]
    pub session_limit: usize,
    /// Quiet period (milliseconds) for debounced session writes
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,
    /// Timeout (seconds) applied to each completion request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl RootConfig {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base_url: default_api_base_url(),
            session_limit: default_session_limit(),
            save_debounce_ms: default_save_debounce_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_session_limit() -> usize {
    DEFAULT_SESSION_LIMIT
}

fn default_save_debounce_ms() -> u64 {
    DEFAULT_SAVE_DEBOUNCE_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// API credentials, stored apart from `config.toml` in `secret.json`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiSecret>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeminiSecret {
    pub api_key: String,
}
