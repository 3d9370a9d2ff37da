//! Domain layer for Cerebro.
//!
//! Owns the conversation data model, the session store, its debounced
//! persistence and the completion client. Concrete storage media, completion
//! services and markdown renderers are plugged in through the traits defined
//! here.

pub mod completion;
pub mod config;
pub mod debounce;
pub mod error;
pub mod persistence;
pub mod session;
pub mod storage;

// Re-export common types
pub use completion::{CompletionClient, CompletionReply, CompletionRequest, CompletionService, MarkdownRenderer};
pub use error::{CerebroError, Result};
pub use persistence::{LoadedState, SessionPersistence};
pub use session::{Session, SessionId, SessionStore};
pub use storage::{KeyValueStorage, MemoryStorage};
