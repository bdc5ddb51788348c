//! Batch metadata for multi-record confirmations
//!
//! Carried alongside the session state; never encoded into user-visible
//! text or record fields.

use serde::{Deserialize, Serialize};

/// One detected entry in a compound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub quantity: u32,
    pub name: String,
}

impl BatchEntry {
    pub fn new(quantity: u32, name: impl Into<String>) -> Self {
        Self {
            quantity,
            name: name.into(),
        }
    }
}

/// Metadata for a multi-record confirmation batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchContext {
    /// Per-entry identifiers, in detection order
    pub entries: Vec<BatchEntry>,
    /// Context common to every entry (location/actor/time hints)
    pub shared_context: String,
}

impl BatchContext {
    pub fn new(entries: Vec<BatchEntry>, shared_context: impl Into<String>) -> Self {
        Self {
            entries,
            shared_context: shared_context.into(),
        }
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Resolve a positional or name reference from the per-entry edit grammar
    ///
    /// Accepts "primera"/"first", "segunda"/"second", "tercera"/"third", a
    /// 1-based number, or an entry name substring.
    pub fn resolve_entry(&self, reference: &str) -> Option<usize> {
        let r = reference.trim().to_lowercase();
        let positional = match r.as_str() {
            "primera" | "primero" | "first" | "1" => Some(0),
            "segunda" | "segundo" | "second" | "2" => Some(1),
            "tercera" | "tercero" | "third" | "3" => Some(2),
            _ => None,
        };
        if let Some(idx) = positional {
            return (idx < self.entries.len()).then_some(idx);
        }
        self.entries.iter().position(|e| e.name.to_lowercase().contains(&r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> BatchContext {
        BatchContext::new(
            vec![BatchEntry::new(2, "CERS"), BatchEntry::new(1, "HAVA")],
            "Hospital Italiano con Pérez",
        )
    }

    #[test]
    fn test_resolve_positional() {
        let b = batch();
        assert_eq!(b.resolve_entry("primera"), Some(0));
        assert_eq!(b.resolve_entry("second"), Some(1));
        assert_eq!(b.resolve_entry("tercera"), None);
    }

    #[test]
    fn test_resolve_by_name() {
        let b = batch();
        assert_eq!(b.resolve_entry("hava"), Some(1));
        assert_eq!(b.resolve_entry("cers"), Some(0));
        assert_eq!(b.resolve_entry("mld"), None);
    }
}
