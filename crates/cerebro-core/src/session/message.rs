//! Conversation message types.
//!
//! A turn is recorded twice: once as a UI-facing [`Message`] and once as a
//! [`HistoryEntry`] in the shape the completion service expects. The two logs
//! of a session always grow together.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a displayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    /// Raw text typed by the user.
    Prompt,
    /// Rendered HTML produced from a model reply.
    Response,
}

/// Borrowed view of a message body, split by how it may be rendered.
///
/// There is no way to obtain a prompt body as HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageBody<'a> {
    /// Untrusted user input; must be escaped by the renderer.
    PlainText(&'a str),
    /// HTML produced by the markdown renderer; already sanitized.
    TrustedHtml(&'a str),
}

/// A single displayed message in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub text: String,
    /// Local wall-clock time (`HH:MM:SS`) the message was created.
    pub timestamp: String,
}

impl Message {
    /// Creates a prompt message stamped with the current local time.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Prompt, text.into())
    }

    /// Creates a response message from already-rendered HTML.
    pub fn response(html: impl Into<String>) -> Self {
        Self::new(MessageKind::Response, html.into())
    }

    fn new(kind: MessageKind, text: String) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            kind,
            text,
            timestamp: format_timestamp(Local::now()),
        }
    }

    pub fn body(&self) -> MessageBody<'_> {
        match self.kind {
            MessageKind::Prompt => MessageBody::PlainText(&self.text),
            MessageKind::Response => MessageBody::TrustedHtml(&self.text),
        }
    }
}

/// Speaker of a history entry, as named by the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// The history role that pairs with a message kind.
    pub fn for_kind(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Prompt => Role::User,
            MessageKind::Response => Role::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One turn of conversation context sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl HistoryEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self::single(Role::User, text.into())
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::single(Role::Model, text.into())
    }

    fn single(role: Role, text: String) -> Self {
        Self {
            role,
            parts: vec![Part { text }],
        }
    }

    /// Concatenated text of all parts.
    pub fn text(&self) -> String {
        self.parts.iter().map(|part| part.text.as_str()).collect()
    }
}

/// Formats a message timestamp (`HH:MM:SS`).
pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}
