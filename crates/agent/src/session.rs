//! Sessions and the session store.
//!
//! A session owns one conversation history and spans many turns. The store
//! maps session ids to owned session state with explicit creation and
//! eviction — in-flight state never lives in a module-level singleton.

use ratchet_core::history::HistoryStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cross-turn context: one history store, one id.
///
/// Shared read/append across turns of the same session, never across
/// sessions.
pub struct Session {
    id: SessionId,
    history: Arc<dyn HistoryStore>,
}

impl Session {
    pub fn new(history: Arc<dyn HistoryStore>) -> Self {
        Self {
            id: SessionId::new(),
            history,
        }
    }

    pub fn with_id(id: SessionId, history: Arc<dyn HistoryStore>) -> Self {
        Self { id, history }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn history(&self) -> &dyn HistoryStore {
        self.history.as_ref()
    }
}

/// Explicit session store: session id → owned session state.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session around the given history backend and register it.
    pub async fn create(&self, history: Arc<dyn HistoryStore>) -> Arc<Session> {
        let session = Arc::new(Session::new(history));
        self.sessions
            .write()
            .await
            .insert(session.id().clone(), Arc::clone(&session));
        tracing::debug!(session_id = %session.id(), "Session created");
        session
    }

    /// Look up a live session.
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove a session. Returns whether it existed.
    pub async fn evict(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::debug!(session_id = %id, "Session evicted");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratchet_core::error::HistoryError;
    use ratchet_core::history::TurnRecord;

    struct EmptyHistory;

    #[async_trait::async_trait]
    impl HistoryStore for EmptyHistory {
        fn name(&self) -> &str {
            "empty"
        }
        async fn append(&self, _record: TurnRecord) -> Result<(), HistoryError> {
            Ok(())
        }
        async fn context_for(&self, _window: usize) -> Result<Vec<TurnRecord>, HistoryError> {
            Ok(Vec::new())
        }
        async fn len(&self) -> Result<usize, HistoryError> {
            Ok(0)
        }
        async fn clear(&self) -> Result<(), HistoryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_get_evict() {
        let store = SessionStore::new();
        let session = store.create(Arc::new(EmptyHistory)).await;
        let id = session.id().clone();

        assert!(store.get(&id).await.is_some());
        assert_eq!(store.len().await, 1);

        assert!(store.evict(&id).await);
        assert!(store.get(&id).await.is_none());
        assert!(!store.evict(&id).await);
    }

    #[tokio::test]
    async fn session_ids_are_unique() {
        let store = SessionStore::new();
        let a = store.create(Arc::new(EmptyHistory)).await;
        let b = store.create(Arc::new(EmptyHistory)).await;
        assert_ne!(a.id(), b.id());
        assert_eq!(store.len().await, 2);
    }
}
