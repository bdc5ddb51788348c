//! Deterministic text normalizers
//!
//! Regex-based parsing for dates, times and quantities. Used by the field
//! wizard to interpret direct answers, and as the partial-extraction fallback
//! when a model response cannot be parsed.

use chrono::{Datelike, Duration, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// Partial date/time components pulled out of free text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateTimeFragments {
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

impl DateTimeFragments {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_date(&self) -> bool {
        self.day.is_some() && self.month.is_some()
    }
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})[/\-](\d{1,2})(?:[/\-](\d{2,4}))?\b").unwrap())
}

fn explicit_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})(?::(\d{2})|\s*hs?\b|\.(\d{2})\b)").unwrap())
}

/// Extract date/time fragments from free text
///
/// Understands numeric dates (dd/mm, dd-mm-yyyy), relative day words
/// ("hoy", "mañana", "pasado mañana", "today", "tomorrow") resolved against
/// `reference`, and times ("14hs", "16:30").
pub fn parse_datetime_fragments(text: &str, reference: NaiveDateTime) -> DateTimeFragments {
    let lower = text.to_lowercase();
    let mut frags = DateTimeFragments::default();

    // Relative day words first: "pasado mañana" must win over "mañana".
    let relative = if lower.contains("pasado mañana") {
        Some(2)
    } else if lower.contains("mañana") || lower.contains("tomorrow") {
        Some(1)
    } else if lower.contains("hoy") || lower.contains("today") {
        Some(0)
    } else {
        None
    };

    if let Some(offset) = relative {
        let date = (reference + Duration::days(offset)).date();
        frags.day = Some(date.day());
        frags.month = Some(date.month());
        frags.year = Some(date.year());
    } else if let Some(cap) = date_re().captures(&lower) {
        let day: u32 = cap[1].parse().unwrap_or(0);
        let month: u32 = cap[2].parse().unwrap_or(0);
        if (1..=31).contains(&day) && (1..=12).contains(&month) {
            frags.day = Some(day);
            frags.month = Some(month);
            if let Some(y) = cap.get(3) {
                let mut year: i32 = y.as_str().parse().unwrap_or(0);
                if year < 100 {
                    year += 2000;
                }
                frags.year = Some(year);
            }
        }
    }

    // Times: only accept patterns with an explicit time marker so bare
    // quantities ("x2", "3") are not mistaken for hours.
    if let Some(cap) = explicit_time_re().captures(&lower) {
        let hour: u32 = cap[1].parse().unwrap_or(99);
        if hour <= 23 {
            frags.hour = Some(hour);
            let minute = cap
                .get(2)
                .or_else(|| cap.get(3))
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            if minute <= 59 {
                frags.minute = Some(minute);
            }
        }
    }

    frags
}

/// Parse a quantity answer ("2", "x2", "dos")
pub fn parse_quantity(text: &str) -> Option<u32> {
    let lower = text.trim().to_lowercase();
    match lower.as_str() {
        "una" | "uno" | "one" => return Some(1),
        "dos" | "two" => return Some(2),
        "tres" | "three" => return Some(3),
        "cuatro" | "four" => return Some(4),
        _ => {}
    }
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\b[x]?(\d{1,3})\b").unwrap());
    let qty: u32 = re.captures(&lower)?.get(1)?.as_str().parse().ok()?;
    (qty >= 1).then_some(qty)
}

/// Hours mentioned in free text, for search scoring
pub fn mentioned_hours(text: &str) -> Vec<u32> {
    let lower = text.to_lowercase();
    explicit_time_re()
        .captures_iter(&lower)
        .filter_map(|cap| cap[1].parse::<u32>().ok())
        .filter(|h| *h <= 23)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 13).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    #[test]
    fn test_tomorrow_with_time() {
        let f = parse_datetime_fragments("mañana 14hs", reference());
        assert_eq!(f.day, Some(14));
        assert_eq!(f.month, Some(8));
        assert_eq!(f.year, Some(2026));
        assert_eq!(f.hour, Some(14));
        assert_eq!(f.minute, Some(0));
    }

    #[test]
    fn test_pasado_manana_wins() {
        let f = parse_datetime_fragments("pasado mañana 9hs", reference());
        assert_eq!(f.day, Some(15));
        assert_eq!(f.hour, Some(9));
    }

    #[test]
    fn test_numeric_date_and_colon_time() {
        let f = parse_datetime_fragments("el 08/09 a las 16:30", reference());
        assert_eq!(f.day, Some(8));
        assert_eq!(f.month, Some(9));
        assert_eq!(f.year, None);
        assert_eq!(f.hour, Some(16));
        assert_eq!(f.minute, Some(30));
    }

    #[test]
    fn test_quantity_not_taken_as_hour() {
        let f = parse_datetime_fragments("CERS x2", reference());
        assert_eq!(f.hour, None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("2"), Some(2));
        assert_eq!(parse_quantity("x3"), Some(3));
        assert_eq!(parse_quantity("dos"), Some(2));
        assert_eq!(parse_quantity("cero"), None);
        assert_eq!(parse_quantity("0"), None);
    }

    #[test]
    fn test_mentioned_hours() {
        assert_eq!(mentioned_hours("a las 16hs o 18:00"), vec![16, 18]);
        assert!(mentioned_hours("2 CERS").is_empty());
    }
}
