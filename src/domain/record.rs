//! ScheduledRecord: the structured entity one conversation builds
//!
//! Built incrementally in memory during the conversation, persisted (id
//! assigned) only at saga-commit time, mutated afterwards only through a
//! `ModificationRequest`, and removed only by compensation or explicit
//! deletion.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A field the wizard can be waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingField {
    ScheduledAt,
    Location,
    Surgeon,
    Procedure,
    Quantity,
    Anesthesiologist,
    /// Waiting for the user to name which field to correct
    AwaitingFieldName,
    /// Waiting for the collaborator's invite email after commit
    AwaitingInviteEmail,
}

impl PendingField {
    /// Required fields in the fixed order the wizard asks for them
    pub const REQUIRED_ORDER: [PendingField; 5] = [
        PendingField::ScheduledAt,
        PendingField::Location,
        PendingField::Surgeon,
        PendingField::Procedure,
        PendingField::Quantity,
    ];

    /// Human-readable field name used in prompts and summaries
    pub fn human_name(&self) -> &'static str {
        match self {
            Self::ScheduledAt => "fecha y hora",
            Self::Location => "lugar",
            Self::Surgeon => "cirujano",
            Self::Procedure => "tipo de cirugía",
            Self::Quantity => "cantidad",
            Self::Anesthesiologist => "anestesiólogo",
            Self::AwaitingFieldName => "campo a corregir",
            Self::AwaitingInviteEmail => "email de invitación",
        }
    }

    /// Match a user-supplied field name against an editable field
    pub fn from_user_name(name: &str) -> Option<Self> {
        let n = name.trim().to_lowercase();
        if n.contains("fecha") || n.contains("hora") || n.contains("date") || n.contains("time") {
            Some(Self::ScheduledAt)
        } else if n.contains("lugar") || n.contains("hospital") || n.contains("location") {
            Some(Self::Location)
        } else if n.contains("cirujano") || n.contains("surgeon") {
            Some(Self::Surgeon)
        } else if n.contains("cirug") || n.contains("procedimiento") || n.contains("procedure") {
            Some(Self::Procedure)
        } else if n.contains("cantidad") || n.contains("quantity") {
            Some(Self::Quantity)
        } else if n.contains("anest") {
            Some(Self::Anesthesiologist)
        } else {
            None
        }
    }
}

/// One scheduled item, owned by a team
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduledRecord {
    /// Store id, assigned at persist time
    pub id: Option<i64>,
    /// Chat that created the record
    pub chat_id: i64,
    /// Owning team
    pub team_id: Option<i64>,
    /// Full scheduled timestamp once date and hour are both known
    pub scheduled_at: Option<NaiveDateTime>,
    // Partially extracted date/time components. The model may give us a day
    // without an hour; these hold whatever arrived until it can be folded
    // into `scheduled_at`.
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub location: Option<String>,
    /// Primary actor
    pub surgeon: Option<String>,
    /// Optional secondary actor
    pub anesthesiologist: Option<String>,
    /// Procedure type
    pub procedure: Option<String>,
    pub quantity: Option<u32>,
    pub notes: Option<String>,
    /// External calendar reference. Set iff the calendar saga step succeeded.
    pub calendar_event_id: Option<String>,
    pub synced_at: Option<NaiveDateTime>,
    pub reminder_sent_at: Option<NaiveDateTime>,
    /// Ordered raw inputs that contributed to this record
    pub input_history: Vec<String>,
}

impl ScheduledRecord {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }

    /// Fold partial date/time components into `scheduled_at` when day, month
    /// and hour are all present. Year defaults to the current one, minute to 0.
    /// Clears the partial fields on success.
    pub fn try_complete_schedule(&mut self) -> bool {
        let (Some(day), Some(month), Some(hour)) = (self.day, self.month, self.hour) else {
            return false;
        };
        let year = self.year.unwrap_or_else(|| Utc::now().year());
        let minute = self.minute.unwrap_or(0);

        let Some(dt) = NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, minute, 0)) else {
            return false;
        };

        self.scheduled_at = Some(dt);
        self.day = None;
        self.month = None;
        self.year = None;
        self.hour = None;
        self.minute = None;
        true
    }

    /// True when the date arrived but the hour is still missing
    pub fn has_date_but_no_hour(&self) -> bool {
        self.scheduled_at.is_none() && self.day.is_some() && self.month.is_some() && self.hour.is_none()
    }

    /// Required fields still missing, in wizard order
    pub fn missing_fields(&self) -> Vec<PendingField> {
        PendingField::REQUIRED_ORDER
            .into_iter()
            .filter(|field| match field {
                PendingField::ScheduledAt => self.scheduled_at.is_none(),
                PendingField::Location => self.location.is_none(),
                PendingField::Surgeon => self.surgeon.is_none(),
                PendingField::Procedure => self.procedure.is_none(),
                PendingField::Quantity => self.quantity.is_none(),
                _ => false,
            })
            .collect()
    }

    /// All required fields present
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Field lines for confirmation summaries and calendar descriptions
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(dt) = self.scheduled_at {
            lines.push(format!("📅 Fecha: {}", dt.format("%d/%m/%Y %H:%M")));
        }
        if let Some(location) = &self.location {
            lines.push(format!("📍 Lugar: {location}"));
        }
        if let Some(surgeon) = &self.surgeon {
            lines.push(format!("👨‍⚕️ Cirujano: {surgeon}"));
        }
        if let Some(procedure) = &self.procedure {
            lines.push(format!("🔧 Cirugía: {procedure}"));
        }
        if let Some(quantity) = self.quantity {
            lines.push(format!("🔢 Cantidad: {quantity}"));
        }
        if let Some(anesthesiologist) = &self.anesthesiologist {
            lines.push(format!("💉 Anestesiólogo: {anesthesiologist}"));
        }
        if let Some(notes) = &self.notes {
            lines.push(format!("📝 Notas: {notes}"));
        }
        lines
    }

    /// True when anything at all has been captured
    pub fn has_some_data(&self) -> bool {
        self.scheduled_at.is_some()
            || self.day.is_some()
            || self.location.is_some()
            || self.surgeon.is_some()
            || self.procedure.is_some()
            || self.quantity.is_some()
            || self.anesthesiologist.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_complete_schedule() {
        let mut rec = ScheduledRecord::new(1);
        rec.day = Some(14);
        rec.month = Some(8);
        assert!(!rec.try_complete_schedule());
        assert!(rec.has_date_but_no_hour());

        rec.hour = Some(14);
        rec.minute = Some(30);
        rec.year = Some(2026);
        assert!(rec.try_complete_schedule());
        let dt = rec.scheduled_at.unwrap();
        assert_eq!(dt.format("%d/%m/%Y %H:%M").to_string(), "14/08/2026 14:30");
        assert!(rec.day.is_none());
    }

    #[test]
    fn test_try_complete_schedule_invalid_date() {
        let mut rec = ScheduledRecord::new(1);
        rec.day = Some(31);
        rec.month = Some(2);
        rec.hour = Some(9);
        rec.year = Some(2026);
        assert!(!rec.try_complete_schedule());
        assert!(rec.scheduled_at.is_none());
    }

    #[test]
    fn test_missing_fields_order() {
        let mut rec = ScheduledRecord::new(1);
        assert_eq!(rec.missing_fields().len(), 5);
        assert_eq!(rec.missing_fields()[0], PendingField::ScheduledAt);

        rec.scheduled_at = NaiveDate::from_ymd_opt(2026, 8, 14).unwrap().and_hms_opt(14, 0, 0);
        assert_eq!(rec.missing_fields()[0], PendingField::Location);

        rec.location = Some("Hospital X".into());
        rec.surgeon = Some("Pérez".into());
        rec.procedure = Some("CERS".into());
        rec.quantity = Some(1);
        assert!(rec.is_complete());
        // secondary actor stays optional
        assert!(rec.anesthesiologist.is_none());
    }

    #[test]
    fn test_field_from_user_name() {
        assert_eq!(PendingField::from_user_name("la hora"), Some(PendingField::ScheduledAt));
        assert_eq!(PendingField::from_user_name("Lugar"), Some(PendingField::Location));
        assert_eq!(PendingField::from_user_name("anestesiologo"), Some(PendingField::Anesthesiologist));
        assert_eq!(PendingField::from_user_name("???"), None);
    }
}
