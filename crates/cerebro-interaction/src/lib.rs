//! Outbound integrations: the Gemini completion service and the markdown
//! renderer used for replies.

pub mod gemini_api_agent;
pub mod markdown;

pub use gemini_api_agent::GeminiApiAgent;
pub use markdown::CommonMarkRenderer;
