//! Sparse modification request for an existing record
//!
//! Absent fields mean "unchanged". Built by the model adapter from free text
//! against the original record, applied as a direct field patch by the store.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::record::ScheduledRecord;

/// Set of optional new values, one per editable field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModificationRequest {
    pub new_date: Option<NaiveDate>,
    pub new_time: Option<NaiveTime>,
    pub new_location: Option<String>,
    pub new_surgeon: Option<String>,
    pub new_anesthesiologist: Option<String>,
    pub new_procedure: Option<String>,
    pub new_quantity: Option<u32>,
    pub new_notes: Option<String>,
}

impl ModificationRequest {
    /// Any field set at all
    pub fn has_changes(&self) -> bool {
        self.new_date.is_some()
            || self.new_time.is_some()
            || self.new_location.is_some()
            || self.new_surgeon.is_some()
            || self.new_anesthesiologist.is_some()
            || self.new_procedure.is_some()
            || self.new_quantity.is_some()
            || self.new_notes.is_some()
    }

    pub fn datetime_changed(&self) -> bool {
        self.new_date.is_some() || self.new_time.is_some()
    }

    pub fn anesthesiologist_changed(&self) -> bool {
        self.new_anesthesiologist.is_some()
    }

    /// Before/after summary shown to the user before applying the patch
    pub fn summary(&self, original: &ScheduledRecord) -> String {
        let mut lines = vec!["Cambios solicitados:".to_string()];

        let orig_date = original
            .scheduled_at
            .map(|dt| dt.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| "sin definir".into());
        let orig_time = original
            .scheduled_at
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_else(|| "sin definir".into());

        if let Some(d) = self.new_date {
            lines.push(format!("• Fecha: {} → {}", orig_date, d.format("%d/%m/%Y")));
        }
        if let Some(t) = self.new_time {
            lines.push(format!("• Hora: {} → {}", orig_time, t.format("%H:%M")));
        }
        if let Some(v) = &self.new_location {
            lines.push(format!("• Lugar: {} → {}", original.location.as_deref().unwrap_or("sin definir"), v));
        }
        if let Some(v) = &self.new_surgeon {
            lines.push(format!("• Cirujano: {} → {}", original.surgeon.as_deref().unwrap_or("sin definir"), v));
        }
        if let Some(v) = &self.new_procedure {
            lines.push(format!("• Cirugía: {} → {}", original.procedure.as_deref().unwrap_or("sin definir"), v));
        }
        if let Some(v) = self.new_quantity {
            lines.push(format!(
                "• Cantidad: {} → {}",
                original.quantity.map(|q| q.to_string()).unwrap_or_else(|| "sin definir".into()),
                v
            ));
        }
        if let Some(v) = &self.new_anesthesiologist {
            lines.push(format!(
                "• Anestesiólogo: {} → {}",
                original.anesthesiologist.as_deref().unwrap_or("sin asignar"),
                v
            ));
        }
        if let Some(v) = &self.new_notes {
            lines.push(format!("• Notas: {}", v));
        }

        lines.push("¿Aplico estos cambios? (sí/no)".to_string());
        lines.join("\n")
    }

    /// Apply the patch to an in-memory record, leaving absent fields untouched
    pub fn apply_to(&self, record: &mut ScheduledRecord) {
        if self.new_date.is_some() || self.new_time.is_some() {
            let base = record.scheduled_at;
            let date = self.new_date.or(base.map(|dt| dt.date()));
            let time = self.new_time.or(base.map(|dt| dt.time()));
            if let (Some(d), Some(t)) = (date, time) {
                record.scheduled_at = Some(d.and_time(t));
            }
        }
        if let Some(v) = &self.new_location {
            record.location = Some(v.clone());
        }
        if let Some(v) = &self.new_surgeon {
            record.surgeon = Some(v.clone());
        }
        if let Some(v) = &self.new_anesthesiologist {
            record.anesthesiologist = Some(v.clone());
        }
        if let Some(v) = &self.new_procedure {
            record.procedure = Some(v.clone());
        }
        if let Some(v) = self.new_quantity {
            record.quantity = Some(v);
        }
        if let Some(v) = &self.new_notes {
            record.notes = Some(v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn original() -> ScheduledRecord {
        let mut rec = ScheduledRecord::new(1);
        rec.scheduled_at = NaiveDate::from_ymd_opt(2026, 9, 23).unwrap().and_hms_opt(14, 0, 0);
        rec.location = Some("Anchorena".into());
        rec.surgeon = Some("Pérez".into());
        rec.procedure = Some("CERS".into());
        rec.quantity = Some(2);
        rec
    }

    #[test]
    fn test_has_changes() {
        let m = ModificationRequest::default();
        assert!(!m.has_changes());
        let m = ModificationRequest {
            new_time: NaiveTime::from_hms_opt(16, 0, 0),
            ..Default::default()
        };
        assert!(m.has_changes());
        assert!(m.datetime_changed());
    }

    #[test]
    fn test_apply_time_only_keeps_date() {
        let mut rec = original();
        let m = ModificationRequest {
            new_time: NaiveTime::from_hms_opt(16, 0, 0),
            ..Default::default()
        };
        m.apply_to(&mut rec);
        let dt = rec.scheduled_at.unwrap();
        assert_eq!(dt.format("%d/%m/%Y %H:%M").to_string(), "23/09/2026 16:00");
        // untouched fields survive
        assert_eq!(rec.location.as_deref(), Some("Anchorena"));
        assert_eq!(rec.quantity, Some(2));
    }

    #[test]
    fn test_summary_lists_only_changed_fields() {
        let m = ModificationRequest {
            new_time: NaiveTime::from_hms_opt(16, 0, 0),
            ..Default::default()
        };
        let s = m.summary(&original());
        assert!(s.contains("Hora: 14:00 → 16:00"));
        assert!(!s.contains("Lugar"));
        assert!(!s.contains("Cirujano"));
    }
}
