//! Per-chat session registry
//!
//! Hands out one locked session per chat id. A turn holds the chat's lock
//! end to end, so turns within a chat are strictly serialized while
//! different chats proceed concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;

use super::state::ConversationSession;

/// Registry of live conversation sessions keyed by chat id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<i64, Arc<AsyncMutex<ConversationSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the session for a chat. The map lock is held only for
    /// the lookup; the caller awaits the per-chat lock outside it.
    pub fn session(&self, chat_id: i64) -> Arc<AsyncMutex<ConversationSession>> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(chat_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationSession::new(chat_id))))
            .clone()
    }

    /// Drop an idle session to bound memory on long-running daemons. A
    /// session whose lock is held is mid-turn and never evicted.
    pub fn evict_if_idle(&self, chat_id: i64) {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(entry) = sessions.get(&chat_id).cloned() else {
            return;
        };
        let idle = entry.try_lock().map(|session| session.is_idle()).unwrap_or(false);
        if idle {
            sessions.remove(&chat_id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ContextType;

    #[tokio::test]
    async fn test_same_chat_same_session() {
        let registry = SessionRegistry::new();
        let a = registry.session(1);
        let b = registry.session(1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_turns_serialize_within_a_chat() {
        let registry = Arc::new(SessionRegistry::new());
        let session = registry.session(7);

        let guard = session.lock().await;
        // a second turn for the same chat must wait
        assert!(session.try_lock().is_err());
        drop(guard);
        assert!(session.try_lock().is_ok());

        // a different chat is unaffected
        assert!(registry.session(8).try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_evict_only_idle() {
        let registry = SessionRegistry::new();
        {
            let session = registry.session(1);
            let mut guard = session.lock().await;
            guard.context = ContextType::FieldWizard;
        }
        registry.evict_if_idle(1);
        assert_eq!(registry.len(), 1);

        {
            let session = registry.session(1);
            session.lock().await.cancel();
        }
        registry.evict_if_idle(1);
        assert!(registry.is_empty());
    }
}
