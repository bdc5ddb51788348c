//! SQLite store implementation
//!
//! Single-connection store behind a mutex. All saga-visible operations are
//! synchronous row-level statements; no query runs long enough to matter.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use super::{RecordStore, StoreError};
use crate::domain::{ModificationRequest, ScheduledRecord};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed RecordStore
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Self::init_schema(&conn)?;
        debug!(path = %path.as_ref().display(), "Opened record store");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory database, for tests that want real SQL semantics
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS scheduled_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                team_id INTEGER,
                scheduled_at TEXT,
                location TEXT,
                surgeon TEXT,
                anesthesiologist TEXT,
                procedure TEXT,
                quantity INTEGER,
                notes TEXT,
                calendar_event_id TEXT,
                synced_at TEXT,
                reminder_sent_at TEXT,
                input_history TEXT NOT NULL DEFAULT '[]'
            );
            CREATE INDEX IF NOT EXISTS idx_records_team_date
                ON scheduled_records (team_id, scheduled_at);",
        )?;
        Ok(())
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ScheduledRecord> {
        let parse_dt = |v: Option<String>| v.and_then(|s| NaiveDateTime::parse_from_str(&s, DATETIME_FMT).ok());
        let history: String = row.get("input_history")?;
        Ok(ScheduledRecord {
            id: Some(row.get("id")?),
            chat_id: row.get("chat_id")?,
            team_id: row.get("team_id")?,
            scheduled_at: parse_dt(row.get("scheduled_at")?),
            day: None,
            month: None,
            year: None,
            hour: None,
            minute: None,
            location: row.get("location")?,
            surgeon: row.get("surgeon")?,
            anesthesiologist: row.get("anesthesiologist")?,
            procedure: row.get("procedure")?,
            quantity: row.get("quantity")?,
            notes: row.get("notes")?,
            calendar_event_id: row.get("calendar_event_id")?,
            synced_at: parse_dt(row.get("synced_at")?),
            reminder_sent_at: parse_dt(row.get("reminder_sent_at")?),
            input_history: serde_json::from_str(&history).unwrap_or_default(),
        })
    }
}

fn fmt_dt(dt: Option<NaiveDateTime>) -> Option<String> {
    dt.map(|d| d.format(DATETIME_FMT).to_string())
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create(&self, record: &ScheduledRecord) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let history =
            serde_json::to_string(&record.input_history).map_err(|e| StoreError::Serialization(e.to_string()))?;
        conn.execute(
            "INSERT INTO scheduled_records
                (chat_id, team_id, scheduled_at, location, surgeon, anesthesiologist,
                 procedure, quantity, notes, calendar_event_id, synced_at,
                 reminder_sent_at, input_history)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.chat_id,
                record.team_id,
                fmt_dt(record.scheduled_at),
                record.location,
                record.surgeon,
                record.anesthesiologist,
                record.procedure,
                record.quantity,
                record.notes,
                record.calendar_event_id,
                fmt_dt(record.synced_at),
                fmt_dt(record.reminder_sent_at),
                history,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Option<ScheduledRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM scheduled_records WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], Self::row_to_record)?;
        rows.next().transpose().map_err(Into::into)
    }

    async fn apply(&self, id: i64, changes: &ModificationRequest) -> Result<(), StoreError> {
        // Read-modify-write keeps the date/time merge logic in one place
        let mut record = self.get(id).await?.ok_or(StoreError::NotFound(id))?;
        changes.apply_to(&mut record);

        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE scheduled_records
             SET scheduled_at = ?1, location = ?2, surgeon = ?3, anesthesiologist = ?4,
                 procedure = ?5, quantity = ?6, notes = ?7
             WHERE id = ?8",
            params![
                fmt_dt(record.scheduled_at),
                record.location,
                record.surgeon,
                record.anesthesiologist,
                record.procedure,
                record.quantity,
                record.notes,
                id,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn set_calendar_link(&self, id: i64, event_id: &str, synced_at: NaiveDateTime) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE scheduled_records SET calendar_event_id = ?1, synced_at = ?2 WHERE id = ?3",
            params![event_id, synced_at.format(DATETIME_FMT).to_string(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM scheduled_records WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn find_in_range(
        &self,
        team_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<ScheduledRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM scheduled_records
             WHERE team_id = ?1 AND scheduled_at >= ?2 AND scheduled_at <= ?3
             ORDER BY scheduled_at ASC",
        )?;
        let rows = stmt.query_map(
            params![
                team_id,
                from.format(DATETIME_FMT).to_string(),
                to.format(DATETIME_FMT).to_string()
            ],
            Self::row_to_record,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    async fn reminders_due(&self, now: NaiveDateTime) -> Result<Vec<ScheduledRecord>, StoreError> {
        let horizon = now + Duration::hours(24);
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM scheduled_records
             WHERE reminder_sent_at IS NULL AND scheduled_at > ?1 AND scheduled_at <= ?2",
        )?;
        let rows = stmt.query_map(
            params![
                now.format(DATETIME_FMT).to_string(),
                horizon.format(DATETIME_FMT).to_string()
            ],
            Self::row_to_record,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    async fn mark_reminder_sent(&self, id: i64, at: NaiveDateTime) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE scheduled_records SET reminder_sent_at = ?1 WHERE id = ?2",
            params![at.format(DATETIME_FMT).to_string(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
