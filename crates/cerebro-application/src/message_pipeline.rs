//! Message send pipeline.
//!
//! `MessagePipeline` carries one user input through the full cycle:
//! optimistic append of the prompt, the completion request, and
//! reconciliation of the reply into the session that was active when the send
//! started.
//!
//! # Per-session state
//!
//! ```text
//! Idle --send--> Sending --reply / no reply / discard--> Idle
//! ```
//!
//! A session that is `Sending` rejects further sends with
//! [`SendOutcome::Busy`], so two requests never interleave their history
//! entries in one session. Other sessions are unaffected.

use cerebro_core::completion::CompletionClient;
use cerebro_core::session::{HistoryEntry, Message, SessionId, SessionStore};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result of a single [`MessagePipeline::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The input was blank; nothing happened.
    Ignored,
    /// No session was active; a new one was seeded with the input and no
    /// completion was requested.
    SessionCreated(SessionId),
    /// No session was active and a new one could not be created.
    LimitReached { limit: usize },
    /// The session already has a send in flight; the input was not applied.
    Busy(SessionId),
    /// The reply was appended to the session.
    Replied(SessionId),
    /// The completion failed; the prompt stays, no reply was appended.
    NoReply(SessionId),
    /// The session was deleted before the reply arrived; the reply was dropped.
    Discarded(SessionId),
}

/// Send state of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Sending,
}

pub struct MessagePipeline {
    store: Arc<SessionStore>,
    client: CompletionClient,
    sending: Arc<Mutex<HashSet<SessionId>>>,
}

impl MessagePipeline {
    /// Creates a pipeline over a session store and a completion client.
    ///
    /// # Arguments
    ///
    /// * `store` - The session store mutated by sends
    /// * `client` - Client used to request replies
    pub fn new(store: Arc<SessionStore>, client: CompletionClient) -> Self {
        Self {
            store,
            client,
            sending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn state(&self, session_id: SessionId) -> SendState {
        if lock(&self.sending).contains(&session_id) {
            SendState::Sending
        } else {
            SendState::Idle
        }
    }

    /// Whether a reply is pending for the session (typing indicator).
    pub fn is_sending(&self, session_id: SessionId) -> bool {
        self.state(session_id) == SendState::Sending
    }

    /// Sends user input to the active session.
    ///
    /// The prompt is appended before the request is made and stays in place
    /// whatever the request's outcome. The reply is appended to the session
    /// captured at the start of the send, even if another session became
    /// active in the meantime.
    pub async fn send(&self, input: &str) -> SendOutcome {
        let text = input.trim();
        if text.is_empty() {
            return SendOutcome::Ignored;
        }

        let Some(session_id) = self.store.active_id() else {
            return match self.store.create_session(Some(text)) {
                Ok(id) => {
                    tracing::info!("[MessagePipeline] Started session {} from first message", id);
                    SendOutcome::SessionCreated(id)
                }
                Err(e) => {
                    tracing::warn!("[MessagePipeline] Could not start a session: {}", e);
                    SendOutcome::LimitReached {
                        limit: self.store.limit(),
                    }
                }
            };
        };

        let Some(_sending) = SendingGuard::acquire(&self.sending, session_id) else {
            tracing::warn!("[MessagePipeline] Rejecting send: session {} is already sending", session_id);
            return SendOutcome::Busy(session_id);
        };

        // Read under the guard so the history includes every settled exchange.
        let Some(prior_history) = self.store.get_session(session_id).map(|session| session.history) else {
            return SendOutcome::Discarded(session_id);
        };
        if !self
            .store
            .append_to_session(session_id, Message::prompt(text), HistoryEntry::user(text))
        {
            return SendOutcome::Discarded(session_id);
        }

        let Some(reply) = self.client.complete(text, &prior_history).await else {
            return SendOutcome::NoReply(session_id);
        };

        if self
            .store
            .append_to_session(session_id, reply.message, reply.history_entry)
        {
            SendOutcome::Replied(session_id)
        } else {
            tracing::debug!("[MessagePipeline] Session {} was deleted mid-flight; reply discarded", session_id);
            SendOutcome::Discarded(session_id)
        }
    }
}

/// Marks a session as `Sending` for as long as it lives.
///
/// Dropping the guard (normal return, early return or unwinding) puts the
/// session back to `Idle`.
struct SendingGuard {
    sending: Arc<Mutex<HashSet<SessionId>>>,
    session_id: SessionId,
}

impl SendingGuard {
    fn acquire(sending: &Arc<Mutex<HashSet<SessionId>>>, session_id: SessionId) -> Option<Self> {
        if !lock(sending).insert(session_id) {
            return None;
        }
        tracing::debug!("[MessagePipeline] Session {} -> Sending", session_id);
        Some(Self {
            sending: Arc::clone(sending),
            session_id,
        })
    }
}

impl Drop for SendingGuard {
    fn drop(&mut self) {
        lock(&self.sending).remove(&self.session_id);
        tracing::debug!("[MessagePipeline] Session {} -> Idle", self.session_id);
    }
}

fn lock(sending: &Mutex<HashSet<SessionId>>) -> MutexGuard<'_, HashSet<SessionId>> {
    sending.lock().unwrap_or_else(PoisonError::into_inner)
}
