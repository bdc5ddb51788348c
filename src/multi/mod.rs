//! Multi-entry detection and input splitting
//!
//! One message may enumerate several independent records ("2 CERS y 1 HAVA
//! mañana en el Italiano"). The detector asks the model service for the
//! entry list, strips the enumerated part out of the original text, and
//! synthesizes one input per entry that carries the shared remainder.

use regex::Regex;
use tracing::{debug, warn};

use crate::domain::{BatchContext, BatchEntry};
use crate::llm::{DetectedEntry, ModelClient};

/// Detections below this confidence take the single-record path
const MIN_CONFIDENCE: f64 = 0.6;

/// Outcome of trying to split a message into independent entries
#[derive(Debug, Clone)]
pub enum SplitOutcome {
    /// Not a compound message; process the original text unmodified
    Single,
    /// Compound message: per-entry synthetic inputs plus batch metadata
    Batch {
        context: BatchContext,
        inputs: Vec<String>,
    },
}

/// Splits compound messages into per-entry synthetic inputs
pub struct MultiEntryDetector;

impl MultiEntryDetector {
    /// Detect and split. Any model failure or low-confidence detection
    /// degrades to the single-record path; splitting is an optimization,
    /// never a gate.
    pub async fn split(model: &dyn ModelClient, text: &str) -> SplitOutcome {
        let detection = match model.detect_multiple_entries(text).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "Multi-entry detection failed, treating as single");
                return SplitOutcome::Single;
            }
        };

        if !detection.is_multiple || detection.entries.len() <= 1 {
            return SplitOutcome::Single;
        }
        if detection.confidence < MIN_CONFIDENCE {
            debug!(confidence = detection.confidence, "Low-confidence detection, treating as single");
            return SplitOutcome::Single;
        }

        let residual = Self::residual_context(text, &detection.entries);
        if residual.is_empty() {
            debug!("No shared context after stripping entries, treating as single");
            return SplitOutcome::Single;
        }

        let inputs = Self::build_inputs(&detection.entries, &residual);
        let entries = detection
            .entries
            .into_iter()
            .map(|e| BatchEntry::new(e.quantity, e.name))
            .collect();
        SplitOutcome::Batch {
            context: BatchContext::new(entries, residual),
            inputs,
        }
    }

    /// Strip every quantity+name mention and the connector tokens from the
    /// original text, leaving only the context shared by all entries.
    pub fn residual_context(text: &str, entries: &[DetectedEntry]) -> String {
        let mut residual = text.to_string();
        for entry in entries {
            let name = regex::escape(&entry.name);
            let q = entry.quantity;
            // "2 CERS", "CERS x2" / "CERS 2", "2xCERS"
            for pattern in [
                format!(r"(?i)\b{q}\s+{name}\b"),
                format!(r"(?i)\b{name}\s*x?\s*{q}\b"),
                format!(r"(?i)\b{q}\s*x\s*{name}\b"),
            ] {
                if let Ok(re) = Regex::new(&pattern) {
                    residual = re.replace_all(&residual, " ").into_owned();
                }
            }
        }
        for pattern in [r"(?i)\bmore\s+than\b", r"(?i)\by\b", r"(?i)\band\b", r"(?i)\bmás\b"] {
            if let Ok(re) = Regex::new(pattern) {
                residual = re.replace_all(&residual, " ").into_owned();
            }
        }
        residual = residual.replace(['+', ','], " ");
        residual.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// One synthetic input per entry, inheriting the shared context
    pub fn build_inputs(entries: &[DetectedEntry], residual: &str) -> Vec<String> {
        entries
            .iter()
            .map(|e| format!("{} {} {}", e.quantity, e.name, residual).trim().to_string())
            .collect()
    }
}
