//! Persistence layer for the session collection and the active pointer.
//!
//! The collection is written under [`CHATS_KEY`] through a [`Debouncer`], so a
//! burst of mutations results in one write of the latest snapshot. The active
//! pointer is small and written immediately under [`ACTIVE_CHAT_KEY`].
//!
//! This layer never mutates session state and never fails its caller: read
//! problems degrade to an empty collection, write problems are logged.

use crate::debounce::Debouncer;
use crate::error::Result;
use crate::session::{Session, SessionId};
use crate::storage::{ACTIVE_CHAT_KEY, CHATS_KEY, KeyValueStorage};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// State rehydrated at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedState {
    pub sessions: Vec<Session>,
    pub active_id: Option<SessionId>,
}

pub struct SessionPersistence {
    storage: Arc<dyn KeyValueStorage>,
    saver: Debouncer<Vec<Session>>,
}

impl SessionPersistence {
    /// Creates a persistence layer writing the collection after `quiet_period`.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new(storage: Arc<dyn KeyValueStorage>, quiet_period: Duration) -> Result<Self> {
        let sink = Arc::clone(&storage);
        let saver = Debouncer::new(quiet_period, move |sessions: Vec<Session>| {
            write_sessions(sink.as_ref(), &sessions);
        })?;

        Ok(Self { storage, saver })
    }

    /// Reads the stored collection and active pointer.
    ///
    /// Missing or malformed data yields an empty collection; an unreadable or
    /// dangling active pointer yields `None`.
    pub fn load(&self) -> LoadedState {
        let sessions = self.load_sessions();
        let active_id = self.load_active_id().filter(|id| {
            let known = sessions.iter().any(|session| session.id == *id);
            if !known {
                tracing::warn!("[Persistence] Dropping active pointer {} with no matching session", id);
            }
            known
        });

        tracing::info!(
            "[Persistence] Loaded {} session(s), active: {:?}",
            sessions.len(),
            active_id
        );
        LoadedState { sessions, active_id }
    }

    /// Schedules a debounced write of `sessions`, superseding any pending one.
    pub fn schedule_save(&self, sessions: Vec<Session>) {
        tracing::debug!("[Persistence] Scheduling save of {} session(s)", sessions.len());
        self.saver.trigger(sessions);
    }

    /// Writes (or removes, for `None`) the active pointer immediately.
    pub fn save_active(&self, id: Option<SessionId>) {
        let result = match id {
            Some(id) => self.storage.set(ACTIVE_CHAT_KEY, &id.to_string()),
            None => self.storage.remove(ACTIVE_CHAT_KEY),
        };
        if let Err(e) = result {
            tracing::error!("[Persistence] Failed to save active session: {}", e);
        }
    }

    /// Performs any pending collection write now.
    pub fn flush(&self) -> bool {
        self.saver.flush()
    }

    pub fn has_pending_save(&self) -> bool {
        self.saver.is_pending()
    }

    fn load_sessions(&self) -> Vec<Session> {
        let raw = match self.storage.get(CHATS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::error!("[Persistence] Failed to read sessions: {}", e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("[Persistence] Failed to parse stored sessions, starting empty: {}", e);
            Vec::new()
        })
    }

    fn load_active_id(&self) -> Option<SessionId> {
        let raw = match self.storage.get(ACTIVE_CHAT_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::error!("[Persistence] Failed to read active session: {}", e);
                return None;
            }
        };

        parse_active_id(&raw)
            .inspect_err(|e| tracing::warn!("[Persistence] Ignoring unreadable active session '{}': {}", raw, e))
            .ok()
    }
}

/// Parses a stored active pointer, accepting a bare id or a JSON string.
fn parse_active_id(raw: &str) -> std::result::Result<SessionId, uuid::Error> {
    let trimmed = raw.trim();
    match serde_json::from_str::<String>(trimmed) {
        Ok(unquoted) => Uuid::parse_str(&unquoted),
        Err(_) => Uuid::parse_str(trimmed),
    }
}

fn write_sessions(storage: &dyn KeyValueStorage, sessions: &[Session]) {
    let json = match serde_json::to_string(sessions) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("[Persistence] Failed to serialize sessions: {}", e);
            return;
        }
    };

    match storage.set(CHATS_KEY, &json) {
        Ok(()) => tracing::debug!("[Persistence] Wrote {} session(s)", sessions.len()),
        Err(e) => tracing::error!("[Persistence] Failed to write sessions: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{HistoryEntry, Message};
    use crate::storage::MemoryStorage;
    use chrono::Local;
    use tokio::time::sleep;

    const QUIET: Duration = Duration::from_millis(300);

    fn sample_sessions() -> Vec<Session> {
        let mut first = Session::with_initial_prompt(Local::now(), "hello");
        first.push(Message::response("<p>hi there</p>\n"), HistoryEntry::model("hi there"));
        let second = Session::new(Local::now());
        vec![first, second]
    }

    #[tokio::test]
    async fn test_load_empty_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = SessionPersistence::new(storage, QUIET).unwrap();

        assert_eq!(persistence.load(), LoadedState::default());
    }

    #[tokio::test]
    async fn test_load_malformed_sessions_falls_back_to_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CHATS_KEY, "{ not json").unwrap();
        storage.set(ACTIVE_CHAT_KEY, &Uuid::new_v4().to_string()).unwrap();
        let persistence = SessionPersistence::new(storage, QUIET).unwrap();

        let loaded = persistence.load();
        assert!(loaded.sessions.is_empty());
        assert_eq!(loaded.active_id, None);
    }

    #[tokio::test]
    async fn test_load_drops_dangling_active_pointer() {
        let storage = Arc::new(MemoryStorage::new());
        let sessions = sample_sessions();
        storage.set(CHATS_KEY, &serde_json::to_string(&sessions).unwrap()).unwrap();
        storage.set(ACTIVE_CHAT_KEY, &Uuid::new_v4().to_string()).unwrap();
        let persistence = SessionPersistence::new(storage, QUIET).unwrap();

        let loaded = persistence.load();
        assert_eq!(loaded.sessions, sessions);
        assert_eq!(loaded.active_id, None);
    }

    #[tokio::test]
    async fn test_load_accepts_quoted_active_pointer() {
        let storage = Arc::new(MemoryStorage::new());
        let sessions = sample_sessions();
        let id = sessions[1].id;
        storage.set(CHATS_KEY, &serde_json::to_string(&sessions).unwrap()).unwrap();
        storage.set(ACTIVE_CHAT_KEY, &format!("\"{id}\"")).unwrap();
        let persistence = SessionPersistence::new(storage, QUIET).unwrap();

        assert_eq!(persistence.load().active_id, Some(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_reproduces_equal_collection() {
        let storage = Arc::new(MemoryStorage::new());
        let sessions = sample_sessions();
        let persistence = SessionPersistence::new(storage.clone(), QUIET).unwrap();

        persistence.schedule_save(sessions.clone());
        persistence.save_active(Some(sessions[0].id));
        sleep(Duration::from_millis(350)).await;

        let reloaded = SessionPersistence::new(storage, QUIET).unwrap().load();
        assert_eq!(reloaded.sessions, sessions);
        assert_eq!(reloaded.active_id, Some(sessions[0].id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_save_writes_only_last_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = SessionPersistence::new(storage.clone(), QUIET).unwrap();
        let sessions = sample_sessions();

        persistence.schedule_save(sessions[..1].to_vec());
        persistence.schedule_save(sessions.clone());
        assert_eq!(storage.write_count(CHATS_KEY), 0);

        sleep(Duration::from_millis(350)).await;
        assert_eq!(storage.write_count(CHATS_KEY), 1);
        let stored: Vec<Session> = serde_json::from_str(&storage.get(CHATS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, sessions);
    }

    #[tokio::test]
    async fn test_save_active_none_removes_key() {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = SessionPersistence::new(storage.clone(), QUIET).unwrap();

        persistence.save_active(Some(Uuid::new_v4()));
        assert!(storage.get(ACTIVE_CHAT_KEY).unwrap().is_some());

        persistence.save_active(None);
        assert!(storage.get(ACTIVE_CHAT_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flush_writes_pending_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = SessionPersistence::new(storage.clone(), QUIET).unwrap();

        persistence.schedule_save(sample_sessions());
        assert!(persistence.has_pending_save());
        assert!(persistence.flush());
        assert_eq!(storage.write_count(CHATS_KEY), 1);
        assert!(!persistence.has_pending_save());
    }

    #[test]
    fn test_parse_active_id_variants() {
        let id = Uuid::new_v4();
        assert_eq!(parse_active_id(&id.to_string()).unwrap(), id);
        assert_eq!(parse_active_id(&format!(" \"{id}\" ")).unwrap(), id);
        assert!(parse_active_id("not-an-id").is_err());
    }
}
