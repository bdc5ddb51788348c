//! Persistent record store seam
//!
//! The saga coordinator and edit orchestrator only see this trait. Two
//! implementations: SQLite for the daemon, in-memory for tests.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::{ModificationRequest, ScheduledRecord};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Persistent store for scheduled records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record and return its assigned id
    async fn create(&self, record: &ScheduledRecord) -> Result<i64, StoreError>;

    async fn get(&self, id: i64) -> Result<Option<ScheduledRecord>, StoreError>;

    /// Apply a sparse field patch; absent fields stay untouched
    async fn apply(&self, id: i64, changes: &ModificationRequest) -> Result<(), StoreError>;

    /// Record the external calendar reference and sync timestamp
    async fn set_calendar_link(&self, id: i64, event_id: &str, synced_at: NaiveDateTime) -> Result<(), StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Records owned by a team scheduled inside [from, to]
    async fn find_in_range(
        &self,
        team_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<ScheduledRecord>, StoreError>;

    /// Records due a reminder: scheduled within 24h of `now`, reminder not
    /// yet sent
    async fn reminders_due(&self, now: NaiveDateTime) -> Result<Vec<ScheduledRecord>, StoreError>;

    async fn mark_reminder_sent(&self, id: i64, at: NaiveDateTime) -> Result<(), StoreError>;
}
