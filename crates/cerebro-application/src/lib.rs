//! Application layer for Cerebro.
//!
//! This crate provides the use cases that coordinate the session store and the
//! completion client.

pub mod message_pipeline;

pub use message_pipeline::{MessagePipeline, SendOutcome, SendState};
