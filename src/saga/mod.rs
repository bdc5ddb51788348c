//! Commit saga for a confirmed record
//!
//! Three sequential steps: persist the record, create the calendar event,
//! link the event back onto the stored row. A failure after the first step
//! triggers compensation of everything already applied, except expired
//! calendar authorization, where the persisted record is deliberately kept.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{error, info, warn};

use crate::calendar::{CalendarError, CalendarService};
use crate::domain::{generate_id, ScheduledRecord};
use crate::store::RecordStore;

/// Per-resource compensation results. `None` means the rollback was never
/// attempted because the step never applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    pub record_deleted: Option<bool>,
    pub event_deleted: Option<bool>,
}

impl RollbackReport {
    /// A compensation that was attempted and failed leaves the resource
    /// dangling; someone has to clean it up by hand.
    pub fn needs_manual_intervention(&self) -> bool {
        self.record_deleted == Some(false) || self.event_deleted == Some(false)
    }
}

/// Outcome of one commit attempt
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// All steps applied: record persisted and linked to its event
    Committed { record_id: i64, event_id: String },
    /// Calendar authorization expired: the record stays persisted without an
    /// event, and the user is told to re-authorize
    PersistedOnly { record_id: i64 },
    /// Commit failed; applied steps were compensated
    Aborted { reason: String, rollback: RollbackReport },
}

/// Coordinates the persist/externalize/link-back commit
pub struct SagaCoordinator {
    store: Arc<dyn RecordStore>,
    calendar: Arc<dyn CalendarService>,
}

impl SagaCoordinator {
    pub fn new(store: Arc<dyn RecordStore>, calendar: Arc<dyn CalendarService>) -> Self {
        Self { store, calendar }
    }

    /// Run the commit saga for a confirmed record
    pub async fn commit(&self, record: &ScheduledRecord, now: NaiveDateTime) -> CommitOutcome {
        let attempt = generate_id("saga");
        info!(attempt, chat_id = record.chat_id, "Starting commit");

        // Step 1: persist. Nothing to compensate on failure.
        let record_id = match self.store.create(record).await {
            Ok(id) => id,
            Err(e) => {
                warn!(attempt, error = %e, "Persist step failed");
                return CommitOutcome::Aborted {
                    reason: format!("no pude guardar el registro: {e}"),
                    rollback: RollbackReport::default(),
                };
            }
        };

        // Step 2: externalize to the calendar.
        let event_id = match self.calendar.create_event(record).await {
            Ok(id) => id,
            Err(CalendarError::AuthExpired) => {
                // Carve-out: the record is kept; only the calendar half is
                // missing and re-authorization will backfill it.
                warn!(attempt, record_id, "Calendar authorization expired, keeping record");
                return CommitOutcome::PersistedOnly { record_id };
            }
            Err(e) => {
                warn!(attempt, record_id, error = %e, "Calendar step failed, compensating");
                let rollback = self.compensate(Some(record_id), None).await;
                return CommitOutcome::Aborted {
                    reason: format!("no pude crear el evento: {e}"),
                    rollback,
                };
            }
        };

        // Step 3: link the event back onto the stored row.
        if let Err(e) = self.store.set_calendar_link(record_id, &event_id, now).await {
            warn!(attempt, record_id, event_id, error = %e, "Link-back failed, compensating");
            let rollback = self.compensate(Some(record_id), Some(&event_id)).await;
            return CommitOutcome::Aborted {
                reason: format!("no pude vincular el evento: {e}"),
                rollback,
            };
        }

        info!(attempt, record_id, event_id, "Commit complete");
        CommitOutcome::Committed { record_id, event_id }
    }

    /// Roll back whichever steps were applied. The two resources are
    /// independent, so their compensations run concurrently; each failure is
    /// logged and reported, never propagated.
    async fn compensate(&self, record_id: Option<i64>, event_id: Option<&str>) -> RollbackReport {
        let delete_record = async {
            match record_id {
                Some(id) => Some(match self.store.delete(id).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(record_id = id, error = %e, "Record compensation failed");
                        false
                    }
                }),
                None => None,
            }
        };
        let delete_event = async {
            match event_id {
                Some(id) => Some(match self.calendar.delete_event(id).await {
                    Ok(()) => true,
                    Err(e) => {
                        error!(event_id = id, error = %e, "Event compensation failed");
                        false
                    }
                }),
                None => None,
            }
        };

        let (record_deleted, event_deleted) = tokio::join!(delete_record, delete_event);
        let report = RollbackReport {
            record_deleted,
            event_deleted,
        };
        if report.needs_manual_intervention() {
            error!(?report, "Compensation incomplete, manual intervention required");
        }
        report
    }

    /// Secondary step after a successful commit: invite a collaborator to
    /// the event. Failures are reported to the caller but never compensated.
    pub async fn invite_collaborator(&self, event_id: &str, email: &str) -> bool {
        match self.calendar.invite(event_id, email).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(event_id, email, error = %e, "Invite failed");
                false
            }
        }
    }
}
