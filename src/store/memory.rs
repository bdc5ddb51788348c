//! In-memory store implementation
//!
//! Backs unit and integration tests; mirrors the SQLite implementation's
//! semantics exactly.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{RecordStore, StoreError};
use crate::domain::{ModificationRequest, ScheduledRecord};

#[derive(Default)]
struct Inner {
    records: HashMap<i64, ScheduledRecord>,
    next_id: i64,
}

/// HashMap-backed RecordStore
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: &ScheduledRecord) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        let mut stored = record.clone();
        stored.id = Some(id);
        inner.records.insert(id, stored);
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<ScheduledRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().records.get(&id).cloned())
    }

    async fn apply(&self, id: i64, changes: &ModificationRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        changes.apply_to(record);
        Ok(())
    }

    async fn set_calendar_link(&self, id: i64, event_id: &str, synced_at: NaiveDateTime) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.calendar_event_id = Some(event_id.to_string());
        record.synced_at = Some(synced_at);
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.inner.lock().unwrap().records.remove(&id).ok_or(StoreError::NotFound(id))?;
        Ok(())
    }

    async fn find_in_range(
        &self,
        team_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<ScheduledRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut found: Vec<_> = inner
            .records
            .values()
            .filter(|r| r.team_id == Some(team_id))
            .filter(|r| r.scheduled_at.is_some_and(|dt| dt >= from && dt <= to))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.scheduled_at);
        Ok(found)
    }

    async fn reminders_due(&self, now: NaiveDateTime) -> Result<Vec<ScheduledRecord>, StoreError> {
        let horizon = now + Duration::hours(24);
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .records
            .values()
            .filter(|r| r.reminder_sent_at.is_none())
            .filter(|r| r.scheduled_at.is_some_and(|dt| dt > now && dt <= horizon))
            .cloned()
            .collect())
    }

    async fn mark_reminder_sent(&self, id: i64, at: NaiveDateTime) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.reminder_sent_at = Some(at);
        Ok(())
    }
}
