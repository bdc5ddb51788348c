//! Per-turn orchestration
//!
//! One entry point per inbound message or callback. The engine owns the
//! full turn: classification, state-machine advance, saga commit and the
//! user-visible reply. Every failure path ends in a message plus a defined
//! next state; nothing propagates past the turn boundary except channel
//! errors the caller may want to retry.

use std::sync::Arc;

use chrono::NaiveDateTime;
use eyre::Result;
use tracing::{debug, info, warn};

use super::state::{ContextType, ConversationSession};
use super::wizard::{parse_yes_no, FieldWizard, ReplyOutcome};
use crate::calendar::CalendarService;
use crate::channel::{ChannelSender, Keyboard};
use crate::classifier::{ContextClassifier, SwitchKind};
use crate::domain::{MessageIntent, PendingField, ScheduledRecord};
use crate::edit::{orchestrator::EditStep, EditOrchestrator};
use crate::llm::ModelClient;
use crate::multi::{MultiEntryDetector, SplitOutcome};
use crate::saga::{CommitOutcome, SagaCoordinator};
use crate::store::RecordStore;
use crate::teams::{ContactDirectory, TeamResolver};

const GUIDANCE: &str = "No entendí el mensaje. Contame una cirugía para agendar, por ejemplo:\n\
                        \"mañana 14hs CERS con Pérez en Hospital Italiano\"";

/// Orchestrates one conversation turn end to end
pub struct TurnEngine {
    model: Arc<dyn ModelClient>,
    store: Arc<dyn RecordStore>,
    sender: Arc<dyn ChannelSender>,
    teams: Arc<dyn TeamResolver>,
    directory: Arc<dyn ContactDirectory>,
    saga: SagaCoordinator,
    editor: EditOrchestrator,
}

impl TurnEngine {
    pub fn new(
        model: Arc<dyn ModelClient>,
        store: Arc<dyn RecordStore>,
        calendar: Arc<dyn CalendarService>,
        sender: Arc<dyn ChannelSender>,
        teams: Arc<dyn TeamResolver>,
        directory: Arc<dyn ContactDirectory>,
    ) -> Self {
        Self {
            model,
            store: store.clone(),
            sender,
            teams,
            directory,
            saga: SagaCoordinator::new(store.clone(), calendar.clone()),
            editor: EditOrchestrator::new(store, calendar),
        }
    }

    /// Process one inbound message while the chat's session lock is held
    pub async fn handle_message(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        debug!(chat_id = session.chat_id, context = ?session.context, "Handling message");

        let verdict =
            ContextClassifier::classify(self.model.as_ref(), text, session.context, &session.context_summary()).await;

        if verdict.is_explicit_switch {
            return self.handle_switch(session, text, now).await;
        }
        if verdict.is_deviation() && !session.is_idle() {
            session.stashed_message = Some(text.to_string());
            let (message, keyboard) = ContextClassifier::deviation_prompt(text);
            return self.send(session.chat_id, &message, Some(keyboard)).await;
        }

        match session.context {
            ContextType::Confirming => self.handle_confirming(session, text, now).await,
            ContextType::FieldWizard => self.handle_wizard_reply(session, text, now).await,
            ContextType::Modifying => self.handle_modifying(session, text, now).await,
            _ => {
                if verdict.is_deviation() {
                    // idle chat, off-domain message
                    return self.send(session.chat_id, GUIDANCE, None).await;
                }
                if session.is_idle() {
                    // no keyword fired; let the model route the intent
                    match self.model.classify_intent(text).await.unwrap_or_default() {
                        MessageIntent::Modify => return self.begin_edit(session, text, now).await,
                        MessageIntent::Query | MessageIntent::Report => {
                            return self.handle_report(session, now).await;
                        }
                        MessageIntent::Cancel => {
                            return self.send(session.chat_id, "No hay ninguna tarea activa.", None).await;
                        }
                        MessageIntent::Help => return self.send(session.chat_id, GUIDANCE, None).await,
                        _ => {}
                    }
                }
                self.start_registration(session, text, now).await
            }
        }
    }

    /// Process an inline-button callback
    pub async fn handle_callback(&self, session: &mut ConversationSession, data: &str, now: NaiveDateTime) -> Result<()> {
        match data {
            "deviation:continue" => {
                session.stashed_message = None;
                let reply = match (session.context, session.pending_field, &session.record) {
                    (_, Some(field), _) => format!("Seguimos. {}", FieldWizard::prompt_for(field)),
                    (ContextType::Confirming, _, Some(record)) => FieldWizard::confirmation_summary(record),
                    (ContextType::Confirming, _, None) if !session.batch_records.is_empty() => {
                        FieldWizard::batch_summary(&session.batch_records)
                    }
                    _ => "Seguimos donde estábamos.".to_string(),
                };
                self.send(session.chat_id, &reply, None).await
            }
            "deviation:new" => {
                let stashed = session.stashed_message.take();
                session.cancel();
                match stashed {
                    Some(text) => self.start_registration(session, &text, now).await,
                    None => self.send(session.chat_id, "Listo, empezamos de nuevo. Contame la cirugía.", None).await,
                }
            }
            other => {
                debug!(data = other, "Ignoring unknown callback");
                Ok(())
            }
        }
    }

    async fn handle_switch(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Result<()> {
        let kind = ContextClassifier::switch_kind(text).map(|(_, k)| k).unwrap_or(SwitchKind::NewTask);
        info!(chat_id = session.chat_id, ?kind, "Explicit task switch");
        match kind {
            SwitchKind::Cancel => {
                let had_task = !session.is_idle();
                session.cancel();
                let reply = if had_task {
                    "Listo, cancelé la tarea actual. Lo ya agendado queda como está."
                } else {
                    "No hay ninguna tarea activa."
                };
                self.send(session.chat_id, reply, None).await
            }
            SwitchKind::Modify => {
                session.cancel();
                session.context = ContextType::Modifying;
                self.begin_edit(session, text, now).await
            }
            SwitchKind::Report => self.handle_report(session, now).await,
            SwitchKind::NewTask => {
                session.cancel();
                self.start_registration(session, text, now).await
            }
        }
    }

    async fn handle_report(&self, session: &mut ConversationSession, now: NaiveDateTime) -> Result<()> {
        let Some(team_id) = self.teams.team_for_chat(session.chat_id).await else {
            return self.send(session.chat_id, "Este chat no tiene un equipo asociado.", None).await;
        };
        let to = now + chrono::Duration::days(30);
        let records = match self.store.find_in_range(team_id, now, to).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Report query failed");
                return self.send(session.chat_id, "No pude consultar la agenda, probá de nuevo.", None).await;
            }
        };
        let reply = if records.is_empty() {
            "No hay cirugías agendadas en los próximos 30 días.".to_string()
        } else {
            let mut lines = vec![format!("Próximas cirugías ({}):", records.len())];
            for record in &records {
                lines.push(format!("• {}", describe_brief(record)));
            }
            lines.join("\n")
        };
        self.send(session.chat_id, &reply, None).await
    }

    /// First free-text message of a registration, possibly compound
    async fn start_registration(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Result<()> {
        match MultiEntryDetector::split(self.model.as_ref(), text).await {
            SplitOutcome::Batch { context, inputs } => {
                info!(chat_id = session.chat_id, entries = context.count(), "Compound message split");
                let mut records = Vec::with_capacity(inputs.len());
                for (input, entry) in inputs.iter().zip(&context.entries) {
                    let mut record = self.build_record(session.chat_id, input, now).await;
                    record.quantity = Some(entry.quantity);
                    if record.procedure.is_none() {
                        record.procedure = Some(entry.name.clone());
                    }
                    records.push(record);
                }
                session.context = ContextType::Registering;
                session.batch = Some(context);
                session.batch_records = records;
                self.advance_batch(session, now).await
            }
            SplitOutcome::Single => {
                let mut record = self.build_record(session.chat_id, text, now).await;
                if !record.has_some_data() {
                    session.cancel();
                    return self.send(session.chat_id, GUIDANCE, None).await;
                }
                // a named procedure with no count means one
                if record.quantity.is_none() && record.procedure.is_some() {
                    record.quantity = Some(1);
                }
                session.context = ContextType::Registering;
                session.record = Some(record);
                self.advance_registration(session, now).await
            }
        }
    }

    async fn build_record(&self, chat_id: i64, text: &str, now: NaiveDateTime) -> ScheduledRecord {
        let mut record = ScheduledRecord::new(chat_id);
        match self.model.extract_fields(text, now).await {
            Ok(map) => map.apply_to(&mut record),
            Err(e) => warn!(error = %e, "Extraction failed, starting from an empty record"),
        }
        record.input_history.push(text.to_string());
        record
    }

    /// Move a single registration to the next prompt or to confirmation
    async fn advance_registration(&self, session: &mut ConversationSession, now: NaiveDateTime) -> Result<()> {
        let Some(record) = session.record.as_mut() else {
            session.cancel();
            return self.send(session.chat_id, GUIDANCE, None).await;
        };

        if let Some(next) = record.missing_fields().into_iter().next() {
            session.context = ContextType::FieldWizard;
            session.pending_field = Some(next);
            session.field_attempts = 0;
            return self.send(session.chat_id, &FieldWizard::prompt_for(next), None).await;
        }

        if let Err(reason) = FieldWizard::validate_schedule(record, now) {
            record.scheduled_at = None;
            session.context = ContextType::FieldWizard;
            session.pending_field = Some(PendingField::ScheduledAt);
            session.field_attempts = 0;
            return self.send(session.chat_id, &reason, None).await;
        }

        session.context = ContextType::Confirming;
        session.pending_field = None;
        let summary = FieldWizard::confirmation_summary(record);
        self.send(session.chat_id, &summary, None).await
    }

    /// Move a batch registration forward: wizard on shared gaps, then one
    /// combined confirmation
    async fn advance_batch(&self, session: &mut ConversationSession, now: NaiveDateTime) -> Result<()> {
        let missing = session
            .batch_records
            .iter()
            .flat_map(|r| r.missing_fields())
            .next();

        if let Some(next) = missing {
            session.context = ContextType::FieldWizard;
            session.pending_field = Some(next);
            session.field_attempts = 0;
            return self.send(session.chat_id, &FieldWizard::prompt_for(next), None).await;
        }

        for record in &mut session.batch_records {
            if let Err(reason) = FieldWizard::validate_schedule(record, now) {
                record.scheduled_at = None;
                session.context = ContextType::FieldWizard;
                session.pending_field = Some(PendingField::ScheduledAt);
                session.field_attempts = 0;
                return self.send(session.chat_id, &reason, None).await;
            }
        }

        session.context = ContextType::Confirming;
        session.pending_field = None;
        let summary = FieldWizard::batch_summary(&session.batch_records);
        self.send(session.chat_id, &summary, None).await
    }

    async fn handle_wizard_reply(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Result<()> {
        let Some(field) = session.pending_field else {
            return self.start_registration(session, text, now).await;
        };

        match field {
            PendingField::AwaitingInviteEmail => return self.handle_invite_email(session, text).await,
            PendingField::AwaitingFieldName => return self.handle_field_name(session, text).await,
            _ => {}
        }

        // Batch wizard: the reply fills the same gap in every entry.
        if !session.batch_records.is_empty() {
            let attempts = session.field_attempts;
            let mut outcome = ReplyOutcome::Accepted { next: None };
            for record in &mut session.batch_records {
                if record.missing_fields().contains(&field) {
                    outcome = FieldWizard::handle_reply(record, field, text, attempts, now);
                    if !matches!(outcome, ReplyOutcome::Accepted { .. }) {
                        break;
                    }
                }
            }
            return match outcome {
                ReplyOutcome::Accepted { .. } => {
                    session.field_attempts = 0;
                    self.advance_batch(session, now).await
                }
                ReplyOutcome::Rejected(reason) => {
                    session.field_attempts += 1;
                    self.send(session.chat_id, &reason, None).await
                }
                ReplyOutcome::NeedsExtraction => {
                    session.field_attempts = 0;
                    if let Ok(map) = self.model.extract_fields(text, now).await {
                        for record in &mut session.batch_records {
                            map.apply_to(record);
                        }
                    }
                    self.advance_batch(session, now).await
                }
            };
        }

        let Some(record) = session.record.as_mut() else {
            return self.start_registration(session, text, now).await;
        };

        match FieldWizard::handle_reply(record, field, text, session.field_attempts, now) {
            ReplyOutcome::Accepted { .. } => {
                session.field_attempts = 0;
                record.input_history.push(text.to_string());
                self.advance_registration(session, now).await
            }
            ReplyOutcome::Rejected(reason) => {
                session.field_attempts += 1;
                self.send(session.chat_id, &reason, None).await
            }
            ReplyOutcome::NeedsExtraction => {
                debug!(chat_id = session.chat_id, "Wizard attempts exhausted, running full extraction");
                session.field_attempts = 0;
                match self.model.extract_fields(text, now).await {
                    Ok(map) => map.apply_to(record),
                    Err(e) => warn!(error = %e, "Fallback extraction failed"),
                }
                record.input_history.push(text.to_string());
                self.advance_registration(session, now).await
            }
        }
    }

    async fn handle_field_name(&self, session: &mut ConversationSession, text: &str) -> Result<()> {
        let Some(field) = PendingField::from_user_name(text) else {
            return self
                .send(
                    session.chat_id,
                    "No reconozco ese campo. Podés corregir: fecha/hora, lugar, cirujano, cirugía, cantidad o anestesiólogo.",
                    None,
                )
                .await;
        };
        let records: Vec<&mut ScheduledRecord> = if session.batch_records.is_empty() {
            session.record.iter_mut().collect()
        } else {
            session.batch_records.iter_mut().collect()
        };
        for record in records {
            match field {
                PendingField::ScheduledAt => record.scheduled_at = None,
                PendingField::Location => record.location = None,
                PendingField::Surgeon => record.surgeon = None,
                PendingField::Procedure => record.procedure = None,
                PendingField::Quantity => record.quantity = None,
                PendingField::Anesthesiologist => record.anesthesiologist = None,
                _ => {}
            }
        }
        session.context = ContextType::FieldWizard;
        session.pending_field = Some(field);
        session.field_attempts = 0;
        self.send(session.chat_id, &FieldWizard::prompt_for(field), None).await
    }

    async fn handle_invite_email(&self, session: &mut ConversationSession, text: &str) -> Result<()> {
        let email = text.trim();
        if !email.contains('@') {
            return self.send(session.chat_id, "Eso no parece un email. ¿Me lo pasás de nuevo?", None).await;
        }
        let Some(event_id) = session.pending_invite_event.clone() else {
            session.cancel();
            return Ok(());
        };
        let accepted = self.saga.invite_collaborator(&event_id, email).await;
        session.cancel();
        let reply = if accepted {
            format!("Le mandé la invitación a {email}.")
        } else {
            format!("No pude invitar a {email}, podés reintentarlo más tarde.")
        };
        self.send(session.chat_id, &reply, None).await
    }

    async fn handle_confirming(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Result<()> {
        if !session.batch_records.is_empty() {
            return self.handle_batch_confirming(session, text, now).await;
        }

        match parse_yes_no(text) {
            Some(true) => self.commit_single(session, now).await,
            Some(false) => {
                session.context = ContextType::FieldWizard;
                session.pending_field = Some(PendingField::AwaitingFieldName);
                session.field_attempts = 0;
                self.send(session.chat_id, &FieldWizard::prompt_for(PendingField::AwaitingFieldName), None).await
            }
            None => self.send(session.chat_id, "Respondé sí o no, por favor.", None).await,
        }
    }

    async fn handle_batch_confirming(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Result<()> {
        match parse_yes_no(text) {
            Some(true) => self.commit_batch(session, now).await,
            Some(false) => {
                self.send(
                    session.chat_id,
                    "Decime qué corregir, por ejemplo: \"primera lugar Anchorena\" o \"hava cantidad 2\".",
                    None,
                )
                .await
            }
            None => match self.apply_batch_edit(session, text, now) {
                Some(reply) => {
                    self.send(session.chat_id, &reply, None).await?;
                    let summary = FieldWizard::batch_summary(&session.batch_records);
                    self.send(session.chat_id, &summary, None).await
                }
                None => self.send(session.chat_id, "Respondé sí, no, o una corrección puntual.", None).await,
            },
        }
    }

    /// Per-entry edit grammar during a batch confirmation:
    /// `<entrada> <campo> <valor>`, e.g. "primera lugar Anchorena"
    fn apply_batch_edit(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Option<String> {
        let batch = session.batch.as_ref()?;
        let mut parts = text.trim().splitn(3, char::is_whitespace);
        let entry_ref = parts.next()?;
        let field_name = parts.next()?;
        let value = parts.next()?.trim();

        let index = batch.resolve_entry(entry_ref)?;
        let field = PendingField::from_user_name(field_name)?;
        let record = session.batch_records.get_mut(index)?;

        match FieldWizard::handle_reply(record, field, value, 0, now) {
            ReplyOutcome::Accepted { .. } => Some(format!(
                "Listo, actualicé {} de la entrada {}.",
                field.human_name(),
                index + 1
            )),
            _ => Some(format!("No pude interpretar \"{value}\" para {}.", field.human_name())),
        }
    }

    async fn commit_single(&self, session: &mut ConversationSession, now: NaiveDateTime) -> Result<()> {
        let Some(mut record) = session.record.clone() else {
            session.cancel();
            return self.send(session.chat_id, GUIDANCE, None).await;
        };
        record.team_id = self.teams.team_for_chat(session.chat_id).await;

        match self.saga.commit(&record, now).await {
            CommitOutcome::Committed { record_id, event_id } => {
                info!(chat_id = session.chat_id, record_id, "Record committed");
                self.send(session.chat_id, "✅ Agendado y sincronizado con el calendario.", None).await?;
                self.offer_invite(session, &record, &event_id).await
            }
            CommitOutcome::PersistedOnly { record_id } => {
                info!(chat_id = session.chat_id, record_id, "Record persisted without calendar");
                session.cancel();
                self.send(
                    session.chat_id,
                    "Guardé el registro, pero tu autorización de calendario venció. \
                     Renovala y el evento se crea en la próxima sincronización.",
                    None,
                )
                .await
            }
            CommitOutcome::Aborted { reason, rollback } => {
                warn!(chat_id = session.chat_id, ?rollback, "Commit aborted");
                let mut reply = format!("⚠️ No pude agendar: {reason}. No quedó nada a medias.");
                if rollback.needs_manual_intervention() {
                    reply = format!("⚠️ No pude agendar: {reason}. Avisale al administrador: quedó un recurso sin limpiar.");
                }
                reply.push_str("\nPodés responder \"sí\" para reintentar o \"cancelar\".");
                self.send(session.chat_id, &reply, None).await
            }
        }
    }

    async fn commit_batch(&self, session: &mut ConversationSession, now: NaiveDateTime) -> Result<()> {
        let team_id = self.teams.team_for_chat(session.chat_id).await;
        let records: Vec<ScheduledRecord> = session
            .batch_records
            .iter()
            .cloned()
            .map(|mut r| {
                r.team_id = team_id;
                r
            })
            .collect();

        let mut lines = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let label = record.procedure.clone().unwrap_or_else(|| format!("entrada {}", i + 1));
            match self.saga.commit(record, now).await {
                CommitOutcome::Committed { .. } => lines.push(format!("✅ {label}: agendada.")),
                CommitOutcome::PersistedOnly { .. } => {
                    lines.push(format!("⚠️ {label}: guardada, falta renovar el calendario."))
                }
                CommitOutcome::Aborted { reason, .. } => lines.push(format!("❌ {label}: {reason}.")),
            }
        }
        session.cancel();
        self.send(session.chat_id, &lines.join("\n"), None).await
    }

    /// Secondary post-commit step: invite the anesthesiologist when one was
    /// named. An unknown address turns into a follow-up question.
    async fn offer_invite(&self, session: &mut ConversationSession, record: &ScheduledRecord, event_id: &str) -> Result<()> {
        let Some(name) = record.anesthesiologist.clone() else {
            session.cancel();
            return Ok(());
        };
        match self.directory.email_for(&name).await {
            Some(email) => {
                let accepted = self.saga.invite_collaborator(event_id, &email).await;
                session.cancel();
                let reply = if accepted {
                    format!("Invité a {name} ({email}) al evento.")
                } else {
                    format!("No pude invitar a {name}, el registro queda agendado igual.")
                };
                self.send(session.chat_id, &reply, None).await
            }
            None => {
                session.cancel();
                session.context = ContextType::FieldWizard;
                session.pending_field = Some(PendingField::AwaitingInviteEmail);
                session.pending_invite_event = Some(event_id.to_string());
                self.send(
                    session.chat_id,
                    &format!("No tengo el email de {name}. ¿A qué dirección le mando la invitación?"),
                    None,
                )
                .await
            }
        }
    }

    async fn handle_modifying(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Result<()> {
        if let Some((record_id, patch)) = session.pending_modification.clone() {
            return match parse_yes_no(text) {
                Some(true) => {
                    let result = self.editor.apply(record_id, &patch, now).await;
                    session.cancel();
                    match result {
                        Ok(()) => {
                            self.send(session.chat_id, "Listo, apliqué los cambios.", None).await?;
                            // a reassigned anesthesiologist gets invited to the existing event
                            if patch.anesthesiologist_changed()
                                && let Ok(Some(record)) = self.store.get(record_id).await
                                && let Some(event_id) = record.calendar_event_id.clone()
                            {
                                return self.offer_invite(session, &record, &event_id).await;
                            }
                            Ok(())
                        }
                        Err(e) => {
                            warn!(record_id, error = %e, "Patch failed");
                            self.send(session.chat_id, "No pude aplicar los cambios, probá de nuevo.", None).await
                        }
                    }
                }
                Some(false) => {
                    session.cancel();
                    self.send(session.chat_id, "Ok, no cambio nada.", None).await
                }
                None => self.send(session.chat_id, "Respondé sí o no, por favor.", None).await,
            };
        }

        if !session.pending_candidates.is_empty() {
            let choice = text.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1)).or_else(|| {
                let lower = text.to_lowercase();
                session.pending_candidates.iter().position(|c| {
                    c.procedure.as_deref().is_some_and(|p| lower.contains(&p.to_lowercase()))
                        || c.surgeon.as_deref().is_some_and(|s| lower.contains(&s.to_lowercase()))
                })
            });
            let Some(index) = choice.filter(|i| *i < session.pending_candidates.len()) else {
                return self.send(session.chat_id, "Decime el número de la opción (1, 2 o 3).", None).await;
            };
            let chosen = session.pending_candidates[index].clone();
            let edit_text = session.pending_edit_text.clone().unwrap_or_default();
            session.pending_candidates.clear();
            let step = self.editor.diff(self.model.as_ref(), &chosen, &edit_text).await?;
            return self.apply_edit_step(session, step).await;
        }

        self.begin_edit(session, text, now).await
    }

    async fn begin_edit(&self, session: &mut ConversationSession, text: &str, now: NaiveDateTime) -> Result<()> {
        let Some(team_id) = self.teams.team_for_chat(session.chat_id).await else {
            session.cancel();
            return self.send(session.chat_id, "Este chat no tiene un equipo asociado.", None).await;
        };
        session.context = ContextType::Modifying;
        session.pending_edit_text = Some(text.to_string());
        let step = self.editor.begin(self.model.as_ref(), team_id, text, now).await?;
        self.apply_edit_step(session, step).await
    }

    async fn apply_edit_step(&self, session: &mut ConversationSession, step: EditStep) -> Result<()> {
        match step {
            EditStep::NotFound(message) | EditStep::NothingToChange(message) => {
                self.send(session.chat_id, &message, None).await
            }
            EditStep::Disambiguate { prompt, candidates } => {
                session.pending_candidates = candidates;
                self.send(session.chat_id, &prompt, None).await
            }
            EditStep::AwaitConfirmation {
                record_id,
                patch,
                summary,
            } => {
                session.pending_modification = Some((record_id, patch));
                self.send(session.chat_id, &summary, None).await
            }
        }
    }

    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<()> {
        self.sender.send(chat_id, text, keyboard).await?;
        Ok(())
    }
}

fn describe_brief(record: &ScheduledRecord) -> String {
    let when = record
        .scheduled_at
        .map(|dt| dt.format("%d/%m %H:%M").to_string())
        .unwrap_or_else(|| "sin fecha".into());
    format!(
        "{} {} — {}{}",
        when,
        record.procedure.as_deref().unwrap_or("cirugía"),
        record.surgeon.as_deref().unwrap_or("sin cirujano"),
        record
            .location
            .as_deref()
            .map(|l| format!(" ({l})"))
            .unwrap_or_default(),
    )
}
