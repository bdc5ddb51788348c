//! Field-by-field collection loop
//!
//! When free-text extraction leaves required fields open, the wizard asks
//! for them one at a time in a fixed order. Direct answers go through
//! deterministic normalizers; after repeated parse failures the whole reply
//! is handed back to full model extraction instead of looping forever.

use chrono::NaiveDateTime;

use crate::domain::{PendingField, ScheduledRecord};
use crate::parse;

/// Parse failures on one field before falling back to full extraction
pub const MAX_FIELD_ATTEMPTS: u32 = 3;

/// Result of handing one reply to the wizard
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    /// Field captured; `next` is the next missing field, if any
    Accepted { next: Option<PendingField> },
    /// Could not parse the reply; re-prompt with this message
    Rejected(String),
    /// Attempts exhausted; run full free-text extraction on the reply
    NeedsExtraction,
}

/// Stateless helpers over the session's record and pending field
pub struct FieldWizard;

impl FieldWizard {
    /// Prompt text for one field
    pub fn prompt_for(field: PendingField) -> String {
        match field {
            PendingField::ScheduledAt => "¿Para cuándo es? Decime fecha y hora (ej: \"mañana 14hs\" o \"23/09 16:00\").".into(),
            PendingField::Location => "¿En qué lugar?".into(),
            PendingField::Surgeon => "¿Quién es el cirujano?".into(),
            PendingField::Procedure => "¿Qué tipo de cirugía es?".into(),
            PendingField::Quantity => "¿Cuántas son?".into(),
            PendingField::Anesthesiologist => "¿Quién es el anestesiólogo? (opcional)".into(),
            PendingField::AwaitingFieldName => "¿Qué campo querés corregir?".into(),
            PendingField::AwaitingInviteEmail => "¿A qué email le mando la invitación?".into(),
        }
    }

    /// Interpret a direct answer to the pending field's prompt
    pub fn handle_reply(
        record: &mut ScheduledRecord,
        field: PendingField,
        text: &str,
        attempts: u32,
        now: NaiveDateTime,
    ) -> ReplyOutcome {
        let applied = Self::apply_reply(record, field, text, now);
        match applied {
            Ok(()) => ReplyOutcome::Accepted {
                next: record.missing_fields().into_iter().next(),
            },
            Err(_) if attempts + 1 >= MAX_FIELD_ATTEMPTS => ReplyOutcome::NeedsExtraction,
            Err(reason) => ReplyOutcome::Rejected(reason),
        }
    }

    fn apply_reply(record: &mut ScheduledRecord, field: PendingField, text: &str, now: NaiveDateTime) -> Result<(), String> {
        let trimmed = text.trim();
        match field {
            PendingField::ScheduledAt => {
                let frags = parse::parse_datetime_fragments(trimmed, now);
                if let Some(v) = frags.day {
                    record.day = Some(v);
                }
                if let Some(v) = frags.month {
                    record.month = Some(v);
                }
                if let Some(v) = frags.year {
                    record.year = Some(v);
                }
                if let Some(v) = frags.hour {
                    record.hour = Some(v);
                }
                if let Some(v) = frags.minute {
                    record.minute = Some(v);
                }
                if record.try_complete_schedule() {
                    Ok(())
                } else if record.has_date_but_no_hour() {
                    Err("Tengo la fecha pero me falta la hora. ¿A qué hora?".into())
                } else {
                    Err("No entendí la fecha. Probá con \"mañana 14hs\" o \"23/09 16:00\".".into())
                }
            }
            PendingField::Location => Self::set_text(&mut record.location, trimmed, "el lugar"),
            PendingField::Surgeon => Self::set_text(&mut record.surgeon, trimmed, "el cirujano"),
            PendingField::Procedure => Self::set_text(&mut record.procedure, trimmed, "el tipo de cirugía"),
            PendingField::Anesthesiologist => Self::set_text(&mut record.anesthesiologist, trimmed, "el anestesiólogo"),
            PendingField::Quantity => match parse::parse_quantity(trimmed) {
                Some(q) => {
                    record.quantity = Some(q);
                    Ok(())
                }
                None => Err("No entendí la cantidad. Decime un número (ej: \"2\").".into()),
            },
            PendingField::AwaitingFieldName | PendingField::AwaitingInviteEmail => {
                // answered at the engine level, not against the record
                Ok(())
            }
        }
    }

    fn set_text(slot: &mut Option<String>, value: &str, what: &str) -> Result<(), String> {
        if value.chars().count() >= 2 {
            *slot = Some(value.to_string());
            Ok(())
        } else {
            Err(format!("No entendí {what}. ¿Me lo repetís?"))
        }
    }

    /// Reject schedules in the past before offering confirmation
    pub fn validate_schedule(record: &ScheduledRecord, now: NaiveDateTime) -> Result<(), String> {
        match record.scheduled_at {
            Some(dt) if dt <= now => Err(format!(
                "La fecha {} ya pasó. ¿Para cuándo la agendo?",
                dt.format("%d/%m/%Y %H:%M")
            )),
            _ => Ok(()),
        }
    }

    /// Summary shown before the final yes/no
    pub fn confirmation_summary(record: &ScheduledRecord) -> String {
        let mut lines = vec!["Voy a agendar:".to_string()];
        lines.extend(record.summary_lines());
        lines.push("¿Confirmás? (sí/no)".to_string());
        lines.join("\n")
    }

    /// Combined summary for a batch of records awaiting one confirmation
    pub fn batch_summary(records: &[ScheduledRecord]) -> String {
        let mut lines = vec![format!("Voy a agendar {} registros:", records.len())];
        for (i, record) in records.iter().enumerate() {
            lines.push(format!("\n{}.", i + 1));
            lines.extend(record.summary_lines());
        }
        lines.push("\n¿Confirmás todos? (sí/no)".to_string());
        lines.join("\n")
    }
}

/// Interpret a yes/no reply. None means neither.
pub fn parse_yes_no(text: &str) -> Option<bool> {
    let t = text.trim().to_lowercase();
    match t.as_str() {
        "si" | "sí" | "s" | "yes" | "ok" | "dale" | "confirmo" | "confirmar" => Some(true),
        "no" | "n" | "nope" => Some(false),
        _ => None,
    }
}
