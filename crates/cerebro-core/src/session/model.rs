//! Session domain model.
//!
//! This module contains the core Session entity: one independent
//! conversation thread with a message log and a history log.

use super::message::{HistoryEntry, Message, Role};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a session.
pub type SessionId = Uuid;

/// Represents a conversation session in the application's domain layer.
///
/// A session contains:
/// - A stable identifier and a human-readable creation label
/// - The displayed messages, in order
/// - The role-tagged history sent to the completion service, one entry per message
///
/// Field names follow the stored JSON layout (`displayId`, `chatHistory`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: SessionId,
    /// Label assigned at creation (`Chat dd/mm/yyyy HH:MM:SS`); never changes
    #[serde(rename = "displayId")]
    pub display_id: String,
    /// Displayed messages
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Completion-service history, parallel to `messages`
    #[serde(default, rename = "chatHistory", alias = "history")]
    pub history: Vec<HistoryEntry>,
}

impl Session {
    /// Creates an empty session labelled with the given creation time.
    pub fn new(created_at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_id: format_display_id(created_at),
            messages: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Creates a session seeded with a first user message.
    pub fn with_initial_prompt(created_at: DateTime<Local>, text: &str) -> Self {
        let mut session = Self::new(created_at);
        session.push(Message::prompt(text), HistoryEntry::user(text));
        session
    }

    /// Appends a message and its history entry together.
    pub(crate) fn push(&mut self, message: Message, entry: HistoryEntry) {
        self.messages.push(message);
        self.history.push(entry);
    }

    /// Checks that both logs have the same length and matching roles.
    pub fn is_consistent(&self) -> bool {
        self.messages.len() == self.history.len()
            && self
                .messages
                .iter()
                .zip(&self.history)
                .all(|(message, entry)| Role::for_kind(message.kind) == entry.role)
    }
}

/// Formats a session label, e.g. `Chat 19/10/2026 14:03:11`.
pub fn format_display_id(at: DateTime<Local>) -> String {
    format!("Chat {}", at.format("%d/%m/%Y %H:%M:%S"))
}

/// Lightweight description of a session for list views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub display_id: String,
    pub message_count: usize,
    pub is_active: bool,
}
