//! Typed result contracts for model service calls
//!
//! Every classifier call has an explicit result type and an explicit
//! "unparseable" path, instead of ad hoc substring recovery scattered at the
//! call sites.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::ScheduledRecord;
use crate::parse;

/// Field map returned by full free-text extraction
///
/// Known keys: `day`, `month`, `year`, `hour`, `minute`, `location`,
/// `surgeon`, `anesthesiologist`, `procedure`, `quantity`, `notes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldMap(pub HashMap<String, String>);

impl FieldMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str()).filter(|s| !s.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge extracted fields into a record, never overwriting values the
    /// user already confirmed through the wizard.
    pub fn apply_to(&self, record: &mut ScheduledRecord) {
        if record.scheduled_at.is_none() {
            if let Some(v) = self.get("day").and_then(|v| v.parse().ok()) {
                record.day = Some(v);
            }
            if let Some(v) = self.get("month").and_then(|v| v.parse().ok()) {
                record.month = Some(v);
            }
            if let Some(v) = self.get("year").and_then(|v| v.parse().ok()) {
                record.year = Some(v);
            }
            if let Some(v) = self.get("hour").and_then(|v| v.parse().ok()) {
                record.hour = Some(v);
            }
            if let Some(v) = self.get("minute").and_then(|v| v.parse().ok()) {
                record.minute = Some(v);
            }
            record.try_complete_schedule();
        }
        if record.location.is_none()
            && let Some(v) = self.get("location")
        {
            record.location = Some(v.to_string());
        }
        if record.surgeon.is_none()
            && let Some(v) = self.get("surgeon")
        {
            record.surgeon = Some(v.to_string());
        }
        if record.anesthesiologist.is_none()
            && let Some(v) = self.get("anesthesiologist")
        {
            record.anesthesiologist = Some(v.to_string());
        }
        if record.procedure.is_none()
            && let Some(v) = self.get("procedure")
        {
            record.procedure = Some(v.to_string());
        }
        if record.quantity.is_none()
            && let Some(v) = self.get("quantity").and_then(parse::parse_quantity)
        {
            record.quantity = Some(v);
        }
        if record.notes.is_none()
            && let Some(v) = self.get("notes")
        {
            record.notes = Some(v.to_string());
        }
    }

    /// Regex-based partial extraction for unparseable model responses
    ///
    /// Pulls whatever date/time fragments the raw text yields; anything else
    /// is dropped and the wizard asks for it.
    pub fn fallback_from_text(text: &str, reference: NaiveDateTime) -> Self {
        let frags = parse::parse_datetime_fragments(text, reference);
        let mut map = HashMap::new();
        if let Some(v) = frags.day {
            map.insert("day".into(), v.to_string());
        }
        if let Some(v) = frags.month {
            map.insert("month".into(), v.to_string());
        }
        if let Some(v) = frags.year {
            map.insert("year".into(), v.to_string());
        }
        if let Some(v) = frags.hour {
            map.insert("hour".into(), v.to_string());
        }
        if let Some(v) = frags.minute {
            map.insert("minute".into(), v.to_string());
        }
        Self(map)
    }
}

/// Structured relevance verdict from the context-analysis call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub relevant: bool,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub context_switch: bool,
}

fn default_confidence() -> f64 {
    0.5
}

/// Outcome of parsing a relevance response: either a typed verdict or the
/// raw text for the heuristic fallback to deal with
#[derive(Debug, Clone)]
pub enum ParsedVerdict {
    Parsed(RelevanceVerdict),
    Unparseable(String),
}

/// One entry in a compound-input detection result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedEntry {
    pub quantity: u32,
    pub name: String,
}

/// Result of the multi-entry detection call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiEntryDetection {
    #[serde(rename = "multiple")]
    pub is_multiple: bool,
    #[serde(default)]
    pub entries: Vec<DetectedEntry>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// Extract the first balanced JSON object from a model response that may
/// wrap it in prose or code fences.
pub fn first_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in response[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 13).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn test_apply_to_fills_and_completes() {
        let mut map = HashMap::new();
        map.insert("day".to_string(), "14".to_string());
        map.insert("month".to_string(), "8".to_string());
        map.insert("year".to_string(), "2026".to_string());
        map.insert("hour".to_string(), "14".to_string());
        map.insert("surgeon".to_string(), "Pérez".to_string());
        map.insert("procedure".to_string(), "CERS".to_string());
        map.insert("location".to_string(), "Hospital X".to_string());

        let mut rec = ScheduledRecord::new(1);
        FieldMap(map).apply_to(&mut rec);

        assert!(rec.scheduled_at.is_some());
        assert_eq!(rec.surgeon.as_deref(), Some("Pérez"));
        assert!(rec.quantity.is_none());
    }

    #[test]
    fn test_apply_to_never_overwrites() {
        let mut rec = ScheduledRecord::new(1);
        rec.location = Some("Anchorena".into());
        let mut map = HashMap::new();
        map.insert("location".to_string(), "Otro".to_string());
        FieldMap(map).apply_to(&mut rec);
        assert_eq!(rec.location.as_deref(), Some("Anchorena"));
    }

    #[test]
    fn test_fallback_from_text() {
        let map = FieldMap::fallback_from_text("mañana 14hs", reference());
        assert_eq!(map.get("day"), Some("14"));
        assert_eq!(map.get("hour"), Some("14"));
        assert_eq!(map.get("location"), None);
    }

    #[test]
    fn test_first_json_object() {
        let raw = "Sure! Here it is:\n{\"multiple\": true, \"entries\": [{\"quantity\": 2, \"name\": \"CERS\"}]}\ntrailing";
        let json = first_json_object(raw).unwrap();
        let parsed: MultiEntryDetection = serde_json::from_str(json).unwrap();
        assert!(parsed.is_multiple);
        assert_eq!(parsed.entries[0], DetectedEntry {
            quantity: 2,
            name: "CERS".into()
        });
    }

    #[test]
    fn test_first_json_object_unbalanced() {
        assert!(first_json_object("no json here").is_none());
        assert!(first_json_object("{\"open\": true").is_none());
    }
}
