use super::message::{HistoryEntry, Message};
use super::model::{Session, SessionId, SessionSummary};
use crate::error::{CerebroError, Result};
use crate::persistence::SessionPersistence;
use chrono::Local;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Owns the session collection and the active-session pointer.
///
/// `SessionStore` is the single source of truth for conversation state. It is
/// responsible for:
/// - Creating sessions (newest first, bounded by a cap)
/// - Switching and deleting sessions while keeping the active pointer valid
/// - Appending messages and history entries in lock-step
/// - Mirroring every change to the persistence layer
///
/// Each mutation runs under a single write lock, and the persistence write is
/// scheduled before the lock is released, so stored snapshots follow mutation
/// order.
pub struct SessionStore {
    state: RwLock<StoreState>,
    persistence: Arc<SessionPersistence>,
    limit: usize,
}

#[derive(Default)]
struct StoreState {
    /// Newest first
    sessions: Vec<Session>,
    active_id: Option<SessionId>,
}

impl StoreState {
    fn position(&self, id: SessionId) -> Option<usize> {
        self.sessions.iter().position(|session| session.id == id)
    }
}

impl SessionStore {
    /// Creates an empty store.
    ///
    /// # Arguments
    ///
    /// * `persistence` - Layer that mirrors the collection and active pointer
    /// * `limit` - Maximum number of sessions kept at once
    pub fn new(persistence: Arc<SessionPersistence>, limit: usize) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            persistence,
            limit,
        }
    }

    /// Creates a store rehydrated from the persistence layer.
    ///
    /// A stored collection larger than `limit` is kept whole; only further
    /// creation is refused.
    pub fn restore(persistence: Arc<SessionPersistence>, limit: usize) -> Self {
        let loaded = persistence.load();
        if loaded.sessions.len() > limit {
            tracing::warn!(
                "[SessionStore] Restored {} sessions, above the limit of {}",
                loaded.sessions.len(),
                limit
            );
        }

        Self {
            state: RwLock::new(StoreState {
                sessions: loaded.sessions,
                active_id: loaded.active_id,
            }),
            persistence,
            limit,
        }
    }

    /// Creates a new session, prepends it and makes it active.
    ///
    /// A non-empty `initial_text` seeds the session with one prompt message
    /// and the matching user history entry.
    ///
    /// # Errors
    ///
    /// Returns `LimitReached` when the collection is already at the cap; no
    /// state changes in that case.
    pub fn create_session(&self, initial_text: Option<&str>) -> Result<SessionId> {
        let mut state = self.write();
        if state.sessions.len() >= self.limit {
            tracing::warn!("[SessionStore] Refusing to create session: limit of {} reached", self.limit);
            return Err(CerebroError::limit_reached(self.limit));
        }

        let now = Local::now();
        let session = match initial_text.filter(|text| !text.is_empty()) {
            Some(text) => Session::with_initial_prompt(now, text),
            None => Session::new(now),
        };
        let id = session.id;

        state.sessions.insert(0, session);
        state.active_id = Some(id);
        tracing::info!("[SessionStore] Created session {} ({} total)", id, state.sessions.len());

        self.persistence.schedule_save(state.sessions.clone());
        self.persistence.save_active(Some(id));
        Ok(id)
    }

    /// Makes `id` the active session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no session has this id; the pointer is unchanged.
    pub fn select_session(&self, id: SessionId) -> Result<()> {
        let mut state = self.write();
        if state.position(id).is_none() {
            return Err(CerebroError::not_found("session", id.to_string()));
        }

        if state.active_id != Some(id) {
            state.active_id = Some(id);
            tracing::debug!("[SessionStore] Switched to session {}", id);
            self.persistence.save_active(Some(id));
        }
        Ok(())
    }

    /// Removes a session.
    ///
    /// When the removed session was active, the first remaining session (or
    /// nothing) becomes active.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no session has this id.
    pub fn delete_session(&self, id: SessionId) -> Result<()> {
        let mut state = self.write();
        let index = state
            .position(id)
            .ok_or_else(|| CerebroError::not_found("session", id.to_string()))?;

        state.sessions.remove(index);
        tracing::info!("[SessionStore] Deleted session {} ({} left)", id, state.sessions.len());

        if state.active_id == Some(id) {
            state.active_id = state.sessions.first().map(|session| session.id);
            self.persistence.save_active(state.active_id);
        }
        self.persistence.schedule_save(state.sessions.clone());
        Ok(())
    }

    /// Appends a message and its history entry to a session, if it still exists.
    ///
    /// Existence is checked under the same lock as the append, so a session
    /// deleted while a request was in flight is never resurrected.
    ///
    /// # Returns
    ///
    /// `true` if the append happened, `false` if the session is gone.
    pub fn append_to_session(&self, id: SessionId, message: Message, entry: HistoryEntry) -> bool {
        let mut state = self.write();
        let Some(index) = state.position(id) else {
            tracing::debug!("[SessionStore] Dropping append to missing session {}", id);
            return false;
        };

        state.sessions[index].push(message, entry);
        self.persistence.schedule_save(state.sessions.clone());
        true
    }

    /// Returns a copy of the session with this id.
    pub fn get_session(&self, id: SessionId) -> Option<Session> {
        let state = self.read();
        state.position(id).map(|index| state.sessions[index].clone())
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.read().active_id
    }

    pub fn active_session(&self) -> Option<Session> {
        self.active_id().and_then(|id| self.get_session(id))
    }

    /// Snapshot of the collection, newest first.
    pub fn sessions(&self) -> Vec<Session> {
        self.read().sessions.clone()
    }

    /// Per-session overview for list views, newest first.
    pub fn summaries(&self) -> Vec<SessionSummary> {
        let state = self.read();
        state
            .sessions
            .iter()
            .map(|session| SessionSummary {
                id: session.id,
                display_id: session.display_id.clone(),
                message_count: session.messages.len(),
                is_active: state.active_id == Some(session.id),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().sessions.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.limit
    }

    /// Writes any pending collection snapshot immediately.
    pub fn flush(&self) -> bool {
        self.persistence.flush()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
