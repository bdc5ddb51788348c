//! Modification orchestration over committed records

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::search::{RecordSearch, SearchOutcome};
use crate::calendar::CalendarService;
use crate::domain::{ModificationRequest, ScheduledRecord};
use crate::llm::ModelClient;
use crate::store::{RecordStore, StoreError};

/// Next step in the edit flow after processing the request text
#[derive(Debug)]
pub enum EditStep {
    /// No candidate matched; tell the user and stay put
    NotFound(String),
    /// Several candidates; user must pick one
    Disambiguate { prompt: String, candidates: Vec<ScheduledRecord> },
    /// The request named a record but no concrete change
    NothingToChange(String),
    /// A patch is ready; show the summary and await yes/no
    AwaitConfirmation {
        record_id: i64,
        patch: ModificationRequest,
        summary: String,
    },
}

/// Drives search/diff/confirm/patch for one edit request
pub struct EditOrchestrator {
    store: Arc<dyn RecordStore>,
    calendar: Arc<dyn CalendarService>,
}

impl EditOrchestrator {
    pub fn new(store: Arc<dyn RecordStore>, calendar: Arc<dyn CalendarService>) -> Self {
        Self { store, calendar }
    }

    /// Process an edit request from scratch: find the record, derive the
    /// patch, produce the confirmation summary.
    pub async fn begin(
        &self,
        model: &dyn ModelClient,
        team_id: i64,
        text: &str,
        now: NaiveDateTime,
    ) -> Result<EditStep, StoreError> {
        match RecordSearch::find(self.store.as_ref(), team_id, text, now).await? {
            SearchOutcome::NotFound => Ok(EditStep::NotFound(
                "No encontré ninguna cirugía que coincida. ¿Me das más detalles (fecha, cirujano o tipo)?".into(),
            )),
            SearchOutcome::Ambiguous(candidates) => {
                let mut lines = vec!["Encontré varias. ¿Cuál es?".to_string()];
                for (i, candidate) in candidates.iter().enumerate() {
                    lines.push(format!("{}. {}", i + 1, describe(candidate)));
                }
                Ok(EditStep::Disambiguate {
                    prompt: lines.join("\n"),
                    candidates,
                })
            }
            SearchOutcome::Single(record) => self.diff(model, &record, text).await,
        }
    }

    /// Derive the patch for an already-chosen record
    pub async fn diff(
        &self,
        model: &dyn ModelClient,
        record: &ScheduledRecord,
        text: &str,
    ) -> Result<EditStep, StoreError> {
        let record_id = record.id.ok_or(StoreError::NotFound(0))?;
        let patch = match model.extract_modification(record, text).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Modification extraction failed");
                ModificationRequest::default()
            }
        };
        if !patch.has_changes() {
            return Ok(EditStep::NothingToChange(format!(
                "Encontré {} pero no entendí qué cambiar. ¿Qué querés modificar?",
                describe(record)
            )));
        }
        let summary = patch.summary(record);
        Ok(EditStep::AwaitConfirmation {
            record_id,
            patch,
            summary,
        })
    }

    /// Apply a confirmed patch. The store update is the source of truth;
    /// calendar re-sync runs detached and only logs its outcome.
    pub async fn apply(&self, record_id: i64, patch: &ModificationRequest, now: NaiveDateTime) -> Result<(), StoreError> {
        self.store.apply(record_id, patch).await?;
        info!(record_id, "Modification applied");

        if patch.datetime_changed() {
            let store = self.store.clone();
            let calendar = self.calendar.clone();
            tokio::spawn(async move {
                if let Err(e) = resync_calendar(store, calendar, record_id, now).await {
                    warn!(record_id, error = %e, "Calendar re-sync failed");
                }
            });
        }
        Ok(())
    }
}

/// Replace the record's calendar event so it reflects the new schedule
async fn resync_calendar(
    store: Arc<dyn RecordStore>,
    calendar: Arc<dyn CalendarService>,
    record_id: i64,
    now: NaiveDateTime,
) -> eyre::Result<()> {
    let Some(record) = store.get(record_id).await? else {
        return Ok(());
    };
    let Some(old_event) = record.calendar_event_id.clone() else {
        return Ok(());
    };

    calendar.delete_event(&old_event).await?;
    let new_event = calendar.create_event(&record).await?;
    store.set_calendar_link(record_id, &new_event, now).await?;
    info!(record_id, old_event, new_event, "Calendar event re-synced");
    Ok(())
}

fn describe(record: &ScheduledRecord) -> String {
    let when = record
        .scheduled_at
        .map(|dt| dt.format("%d/%m %H:%M").to_string())
        .unwrap_or_else(|| "sin fecha".into());
    format!(
        "{} el {} con {}{}",
        record.procedure.as_deref().unwrap_or("cirugía"),
        when,
        record.surgeon.as_deref().unwrap_or("cirujano sin definir"),
        record
            .location
            .as_deref()
            .map(|l| format!(" en {l}"))
            .unwrap_or_default(),
    )
}
