//! In-memory quiz session store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::model::{QuizSession, SessionKey};
use crate::traits::QuizStore;

/// Process-local [`QuizStore`]. Sessions are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryQuizStore {
    sessions: Mutex<HashMap<SessionKey, QuizSession>>,
}

impl InMemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently in progress.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written session,
    // so a poisoned map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<SessionKey, QuizSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl QuizStore for InMemoryQuizStore {
    fn get(&self, key: SessionKey) -> Option<QuizSession> {
        self.lock().get(&key).cloned()
    }

    fn put(&self, key: SessionKey, session: QuizSession) {
        self.lock().insert(key, session);
    }

    fn remove(&self, key: SessionKey) -> Option<QuizSession> {
        self.lock().remove(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let store = InMemoryQuizStore::new();
        assert!(store.get(SessionKey(1)).is_none());

        let mut session = QuizSession::new(SessionKey(1));
        session.index = 2;
        store.put(SessionKey(1), session.clone());
        assert_eq!(store.get(SessionKey(1)), Some(session.clone()));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove(SessionKey(1)), Some(session));
        assert!(store.is_empty());
        assert!(store.remove(SessionKey(1)).is_none());
    }

    #[test]
    fn sessions_are_isolated_by_key() {
        let store = InMemoryQuizStore::new();
        store.put(SessionKey(1), QuizSession::new(SessionKey(1)));
        let mut other = QuizSession::new(SessionKey(2));
        other.score = 5;
        store.put(SessionKey(2), other);

        assert_eq!(store.get(SessionKey(1)).map(|s| s.score), Some(0));
        assert_eq!(store.get(SessionKey(2)).map(|s| s.score), Some(5));
    }

    #[test]
    fn usable_as_trait_object() {
        let store: std::sync::Arc<dyn QuizStore> = std::sync::Arc::new(InMemoryQuizStore::new());
        store.put(SessionKey(3), QuizSession::new(SessionKey(3)));
        assert!(store.get(SessionKey(3)).is_some());
    }
}
