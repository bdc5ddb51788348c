//! Weighted record search
//!
//! Scores every record in a bounded window against the free-text edit
//! request. Additive weights favor precise date mentions over loose name
//! overlap; ties break toward the earlier schedule.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike, Weekday};

use crate::domain::ScheduledRecord;
use crate::parse;
use crate::store::{RecordStore, StoreError};

/// How far back candidates are considered
const WINDOW_BACK_DAYS: i64 = 30;

/// How far forward candidates are considered
const WINDOW_FORWARD_DAYS: i64 = 365;

/// Maximum candidates surfaced for disambiguation
const MAX_CANDIDATES: usize = 3;

/// Result of a candidate search
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// Nothing in the window scored at all
    NotFound,
    /// One clear candidate
    Single(ScheduledRecord),
    /// Several plausible candidates, best first
    Ambiguous(Vec<ScheduledRecord>),
}

/// Scores and ranks records against an edit request
pub struct RecordSearch;

impl RecordSearch {
    /// Find candidate records for a free-text edit request
    pub async fn find(
        store: &dyn RecordStore,
        team_id: i64,
        text: &str,
        now: NaiveDateTime,
    ) -> Result<SearchOutcome, StoreError> {
        let from = now - Duration::days(WINDOW_BACK_DAYS);
        let to = now + Duration::days(WINDOW_FORWARD_DAYS);
        let candidates = store.find_in_range(team_id, from, to).await?;

        let mut scored: Vec<(i64, ScheduledRecord)> = candidates
            .into_iter()
            .map(|r| (Self::score(&r, text, now), r))
            .filter(|(score, _)| *score > 0)
            .collect();

        // highest score first, earlier schedule on ties
        scored.sort_by(|(sa, ra), (sb, rb)| sb.cmp(sa).then(ra.scheduled_at.cmp(&rb.scheduled_at)));
        scored.truncate(MAX_CANDIDATES);

        let mut ranked: Vec<ScheduledRecord> = scored.into_iter().map(|(_, r)| r).collect();
        Ok(match ranked.len() {
            0 => SearchOutcome::NotFound,
            1 => SearchOutcome::Single(ranked.remove(0)),
            _ => SearchOutcome::Ambiguous(ranked),
        })
    }

    /// Additive relevance score of one record against the request text
    pub fn score(record: &ScheduledRecord, text: &str, now: NaiveDateTime) -> i64 {
        let Some(scheduled) = record.scheduled_at else {
            return 0;
        };
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let mut score = 0i64;

        // Date signals. An exact day+month mention dominates everything.
        let frags = parse::parse_datetime_fragments(&lower, now);
        if frags.has_date() {
            if frags.day == Some(scheduled.day()) && frags.month == Some(scheduled.month()) {
                score += 80;
            }
        } else if frags.day == Some(scheduled.day()) {
            score += 20;
        }

        if let Some(weekday) = mentioned_weekday(&lower)
            && scheduled.weekday() == weekday
        {
            score += 50;
        }

        if let Some(offset) = relative_day_offset(&lower)
            && scheduled.date() == (now + Duration::days(offset)).date()
        {
            score += 60;
        }

        if parse::mentioned_hours(&lower).contains(&scheduled.hour()) {
            score += 40;
        }

        // Actor and place signals.
        if let Some(surgeon) = &record.surgeon {
            let s = surgeon.to_lowercase();
            for token in &tokens {
                if s.contains(token) {
                    score += if token.chars().count() >= 3 { 30 } else { 15 };
                }
            }
        }

        if let Some(procedure) = &record.procedure {
            let p = procedure.to_lowercase();
            if lower.contains(&p) {
                score += 25;
            } else if let Some(acronym) = acronym_of(&p)
                && tokens.contains(&acronym.as_str())
            {
                score += 20;
            }
        }

        if let Some(location) = &record.location {
            let l = location.to_lowercase();
            for token in tokens.iter().filter(|t| t.chars().count() >= 3) {
                if l.contains(token) {
                    score += 15;
                }
            }
        }

        score
    }
}

/// Weekday named in the text, Spanish or English
fn mentioned_weekday(lower: &str) -> Option<Weekday> {
    const NAMES: &[(&str, Weekday)] = &[
        ("lunes", Weekday::Mon),
        ("martes", Weekday::Tue),
        ("miércoles", Weekday::Wed),
        ("miercoles", Weekday::Wed),
        ("jueves", Weekday::Thu),
        ("viernes", Weekday::Fri),
        ("sábado", Weekday::Sat),
        ("sabado", Weekday::Sat),
        ("domingo", Weekday::Sun),
        ("monday", Weekday::Mon),
        ("tuesday", Weekday::Tue),
        ("wednesday", Weekday::Wed),
        ("thursday", Weekday::Thu),
        ("friday", Weekday::Fri),
        ("saturday", Weekday::Sat),
        ("sunday", Weekday::Sun),
    ];
    NAMES.iter().find(|(name, _)| lower.contains(name)).map(|(_, wd)| *wd)
}

/// Relative-day word offset, "pasado mañana" before "mañana"
fn relative_day_offset(lower: &str) -> Option<i64> {
    if lower.contains("pasado mañana") {
        Some(2)
    } else if lower.contains("mañana") || lower.contains("tomorrow") {
        Some(1)
    } else if lower.contains("hoy") || lower.contains("today") {
        Some(0)
    } else {
        None
    }
}

/// First letters of a multi-word name ("cirugía endoscópica rinosinusal" →
/// "cer"); single words have no acronym
fn acronym_of(name: &str) -> Option<String> {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() < 2 {
        return None;
    }
    Some(words.iter().filter_map(|w| w.chars().next()).collect())
}
