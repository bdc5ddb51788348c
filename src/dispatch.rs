//! Inbound dispatch
//!
//! The transport layer (bot webhook, long-poller, stdin harness) hands raw
//! inbound events here. The dispatcher pins each event to its chat's session
//! lock and runs one engine turn, so turns within a chat never interleave.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use eyre::Result;
use tracing::instrument;

use crate::session::{SessionRegistry, TurnEngine};

/// Entry point for inbound messages and callbacks
pub struct Dispatcher {
    registry: SessionRegistry,
    engine: Arc<TurnEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<TurnEngine>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            engine,
        }
    }

    /// Handle one text message from a chat
    #[instrument(skip(self, text))]
    pub async fn handle_inbound_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let session = self.registry.session(chat_id);
        let mut guard = session.lock().await;
        let result = self.engine.handle_message(&mut guard, text, Self::now()).await;
        drop(guard);
        self.registry.evict_if_idle(chat_id);
        result
    }

    /// Handle one inline-button callback from a chat
    #[instrument(skip(self))]
    pub async fn handle_callback(&self, chat_id: i64, data: &str) -> Result<()> {
        let session = self.registry.session(chat_id);
        let mut guard = session.lock().await;
        let result = self.engine.handle_callback(&mut guard, data, Self::now()).await;
        drop(guard);
        self.registry.evict_if_idle(chat_id);
        result
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}
