//! Completion client.
//!
//! [`CompletionClient`] turns one user turn plus the prior history into a
//! request for a [`CompletionService`], and the raw reply into a displayable
//! response [`Message`] and a model [`HistoryEntry`]. Failures of any kind are
//! logged here and surface as `None`; nothing past this boundary sees an error.

use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::error::{CerebroError, Result};
use crate::session::{HistoryEntry, Message};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// One request to the completion service.
///
/// `history` is the conversation context before this turn; the service
/// appends `message` as the new user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub history: Vec<HistoryEntry>,
    pub message: String,
}

/// The external generative-AI API.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends one turn and returns the raw (markdown) reply text.
    async fn send_message(&self, request: CompletionRequest) -> Result<String>;
}

/// Pure markdown-to-HTML conversion.
///
/// Implementations must return HTML that is safe to render as-is.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// A successful completion, ready to append to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReply {
    pub message: Message,
    pub history_entry: HistoryEntry,
}

pub struct CompletionClient {
    service: Arc<dyn CompletionService>,
    renderer: Arc<dyn MarkdownRenderer>,
    model: String,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(
        service: Arc<dyn CompletionService>,
        renderer: Arc<dyn MarkdownRenderer>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            service,
            renderer,
            model: model.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests a reply to `user_text` given `prior_history`.
    ///
    /// # Returns
    ///
    /// - `Some(reply)`: Response message (rendered HTML) and model history entry (raw text)
    /// - `None`: The request failed, timed out or returned nothing usable
    pub async fn complete(&self, user_text: &str, prior_history: &[HistoryEntry]) -> Option<CompletionReply> {
        let request = CompletionRequest {
            model: self.model.clone(),
            history: prior_history.to_vec(),
            message: user_text.to_string(),
        };

        tracing::debug!(
            "[CompletionClient] Sending turn with {} history entries to {}",
            request.history.len(),
            self.model
        );

        match self.request(request).await {
            Ok(raw) => Some(CompletionReply {
                message: Message::response(self.renderer.render(&raw)),
                history_entry: HistoryEntry::model(raw),
            }),
            Err(e) => {
                tracing::error!("[CompletionClient] Completion failed: {}", e);
                None
            }
        }
    }

    async fn request(&self, request: CompletionRequest) -> Result<String> {
        let raw = tokio::time::timeout(self.timeout, self.service.send_message(request))
            .await
            .map_err(|_| {
                CerebroError::completion(format!("request timed out after {:?}", self.timeout))
            })??;

        if raw.trim().is_empty() {
            return Err(CerebroError::completion("service returned an empty reply"));
        }
        Ok(raw)
    }
}
