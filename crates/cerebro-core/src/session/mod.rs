//! Session domain module.
//!
//! This module contains the conversation data model and the store that owns
//! it.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`, `SessionSummary`)
//! - `message`: Message and history types (`Message`, `MessageKind`, `HistoryEntry`, `Role`)
//! - `store`: In-memory collection and active pointer (`SessionStore`)
//!
//! # Usage
//!
//! ```ignore
//! use cerebro_core::session::{Session, SessionId, SessionStore};
//! use cerebro_core::session::{HistoryEntry, Message, MessageBody, MessageKind};
//! ```

mod message;
mod model;
mod store;
mod store_test;

// Re-export public API
pub use message::{HistoryEntry, Message, MessageBody, MessageKind, Part, Role, format_timestamp};
pub use model::{Session, SessionId, SessionSummary, format_display_id};
pub use store::SessionStore;
