#[cfg(test)]
mod tests {
    use crate::error::CerebroError;
    use crate::persistence::SessionPersistence;
    use crate::session::message::{HistoryEntry, Message, MessageKind, Role};
    use crate::session::store::SessionStore;
    use crate::storage::{ACTIVE_CHAT_KEY, CHATS_KEY, KeyValueStorage, MemoryStorage};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    const QUIET: Duration = Duration::from_millis(300);

    fn store_with_storage(limit: usize) -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = Arc::new(SessionPersistence::new(storage.clone(), QUIET).unwrap());
        (SessionStore::new(persistence, limit), storage)
    }

    fn store(limit: usize) -> SessionStore {
        store_with_storage(limit).0
    }

    #[tokio::test]
    async fn test_create_session_is_active_and_first() {
        let store = store(10);
        let older = store.create_session(None).unwrap();
        let newer = store.create_session(None).unwrap();

        assert_eq!(store.active_id(), Some(newer));
        let sessions = store.sessions();
        assert_eq!(sessions[0].id, newer);
        assert_eq!(sessions[1].id, older);
    }

    #[tokio::test]
    async fn test_create_session_with_initial_text_seeds_both_logs() {
        let store = store(10);
        let id = store.create_session(Some("hello")).unwrap();

        let session = store.get_session(id).unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].kind, MessageKind::Prompt);
        assert_eq!(session.messages[0].text, "hello");
        assert_eq!(session.history, vec![HistoryEntry::user("hello")]);
        assert!(session.display_id.starts_with("Chat "));
    }

    #[tokio::test]
    async fn test_create_session_with_empty_text_is_empty() {
        let store = store(10);
        let id = store.create_session(Some("")).unwrap();

        let session = store.get_session(id).unwrap();
        assert!(session.messages.is_empty());
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn test_create_session_rejects_at_limit() {
        let store = store(10);
        for _ in 0..10 {
            store.create_session(None).unwrap();
        }
        let active_before = store.active_id();

        let result = store.create_session(Some("one too many"));

        assert_eq!(result, Err(CerebroError::limit_reached(10)));
        assert_eq!(store.len(), 10);
        assert_eq!(store.active_id(), active_before);
        assert!(store.is_full());
    }

    #[tokio::test]
    async fn test_select_session() {
        let store = store(10);
        let first = store.create_session(None).unwrap();
        let _second = store.create_session(None).unwrap();

        store.select_session(first).unwrap();
        assert_eq!(store.active_id(), Some(first));

        let err = store.select_session(uuid::Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.active_id(), Some(first));
    }

    #[tokio::test]
    async fn test_delete_active_reassigns_to_first_remaining() {
        let store = store(10);
        let a = store.create_session(None).unwrap();
        let b = store.create_session(None).unwrap();
        let c = store.create_session(None).unwrap();
        // Collection is [c, b, a]; make b active and delete it.
        store.select_session(b).unwrap();

        store.delete_session(b).unwrap();

        assert_eq!(store.active_id(), Some(c));
        let ids: Vec<_> = store.sessions().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![c, a]);
    }

    #[tokio::test]
    async fn test_delete_first_active_moves_to_next() {
        let store = store(10);
        let a = store.create_session(None).unwrap();
        let b = store.create_session(None).unwrap();
        let c = store.create_session(None).unwrap();
        assert_eq!(store.active_id(), Some(c));

        store.delete_session(c).unwrap();

        assert_eq!(store.active_id(), Some(b));
        assert_eq!(store.len(), 2);
        assert!(store.get_session(a).is_some());
    }

    #[tokio::test]
    async fn test_delete_inactive_keeps_pointer() {
        let store = store(10);
        let a = store.create_session(None).unwrap();
        let b = store.create_session(None).unwrap();

        store.delete_session(a).unwrap();

        assert_eq!(store.active_id(), Some(b));
    }

    #[tokio::test]
    async fn test_delete_last_session_clears_pointer() {
        let (store, storage) = store_with_storage(10);
        let only = store.create_session(None).unwrap();
        assert!(storage.get(ACTIVE_CHAT_KEY).unwrap().is_some());

        store.delete_session(only).unwrap();

        assert_eq!(store.active_id(), None);
        assert!(store.is_empty());
        assert!(storage.get(ACTIVE_CHAT_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_session_is_not_found() {
        let store = store(10);
        store.create_session(None).unwrap();

        let err = store.delete_session(uuid::Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_append_keeps_logs_in_lock_step() {
        let store = store(10);
        let id = store.create_session(Some("hi")).unwrap();

        assert!(store.append_to_session(id, Message::response("<p>hey</p>"), HistoryEntry::model("hey")));
        assert!(store.append_to_session(id, Message::prompt("again"), HistoryEntry::user("again")));

        let session = store.get_session(id).unwrap();
        assert_eq!(session.messages.len(), session.history.len());
        for (message, entry) in session.messages.iter().zip(&session.history) {
            assert_eq!(entry.role == Role::User, message.kind == MessageKind::Prompt);
        }
        assert!(session.is_consistent());
    }

    #[tokio::test]
    async fn test_append_to_deleted_session_is_dropped() {
        let store = store(10);
        let keep = store.create_session(None).unwrap();
        let gone = store.create_session(None).unwrap();
        store.delete_session(gone).unwrap();

        assert!(!store.append_to_session(gone, Message::prompt("late"), HistoryEntry::user("late")));
        assert_eq!(store.len(), 1);
        assert!(store.get_session(keep).unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_summaries_mark_active() {
        let store = store(10);
        let a = store.create_session(Some("x")).unwrap();
        let b = store.create_session(None).unwrap();

        let summaries = store.summaries();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, b);
        assert!(summaries[0].is_active);
        assert_eq!(summaries[1].id, a);
        assert_eq!(summaries[1].message_count, 1);
        assert!(!summaries[1].is_active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_appends_is_written_once() {
        let (store, storage) = store_with_storage(10);
        let id = store.create_session(None).unwrap();
        sleep(Duration::from_millis(400)).await;
        assert_eq!(storage.write_count(CHATS_KEY), 1);

        for i in 0..5 {
            store.append_to_session(id, Message::prompt(format!("m{i}")), HistoryEntry::user(format!("m{i}")));
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(storage.write_count(CHATS_KEY), 1);

        sleep(Duration::from_millis(350)).await;
        assert_eq!(storage.write_count(CHATS_KEY), 2);

        let stored: Vec<crate::session::Session> =
            serde_json::from_str(&storage.get(CHATS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, store.sessions());
        assert_eq!(stored[0].messages.len(), 5);
        assert_eq!(stored[0].messages[4].text, "m4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_rehydrates_previous_state() {
        let storage = Arc::new(MemoryStorage::new());
        let (first, second) = {
            let persistence = Arc::new(SessionPersistence::new(storage.clone(), QUIET).unwrap());
            let store = SessionStore::new(persistence, 10);
            let first = store.create_session(Some("first")).unwrap();
            let second = store.create_session(Some("second")).unwrap();
            store.select_session(first).unwrap();
            sleep(Duration::from_millis(400)).await;
            (first, second)
        };

        let persistence = Arc::new(SessionPersistence::new(storage, QUIET).unwrap());
        let restored = SessionStore::restore(persistence, 10);

        assert_eq!(restored.active_id(), Some(first));
        let ids: Vec<_> = restored.sessions().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(restored.get_session(first).unwrap().messages[0].text, "first");
    }

    #[tokio::test]
    async fn test_flush_persists_without_waiting() {
        let (store, storage) = store_with_storage(10);
        store.create_session(Some("now")).unwrap();

        assert!(store.flush());
        assert_eq!(storage.write_count(CHATS_KEY), 1);
    }
}
