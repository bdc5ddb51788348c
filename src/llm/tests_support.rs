//! Programmable ModelClient mock shared by unit tests

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Mutex;

use super::client::ModelClient;
use super::error::LlmError;
use super::types::{DetectedEntry, FieldMap, MultiEntryDetection, ParsedVerdict, RelevanceVerdict};
use crate::domain::{MessageIntent, ModificationRequest, ScheduledRecord};

enum RelevanceBehavior {
    Parsed(RelevanceVerdict),
    Unparseable,
    Fail,
}

/// Canned-answer ModelClient. Every call falls back to regex extraction or
/// a benign default unless programmed otherwise.
pub struct MockModel {
    fields: Mutex<Vec<FieldMap>>,
    intent: Mutex<MessageIntent>,
    new_entry: Mutex<bool>,
    multi: Mutex<MultiEntryDetection>,
    relevance: Mutex<RelevanceBehavior>,
    modification: Mutex<ModificationRequest>,
    relevance_calls: Mutex<u32>,
    extract_calls: Mutex<u32>,
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            fields: Mutex::new(Vec::new()),
            intent: Mutex::new(MessageIntent::Unknown),
            new_entry: Mutex::new(false),
            multi: Mutex::new(MultiEntryDetection::default()),
            relevance: Mutex::new(RelevanceBehavior::Parsed(RelevanceVerdict {
                relevant: true,
                confidence: 0.9,
                reason: "mock".into(),
                context_switch: false,
            })),
            modification: Mutex::new(ModificationRequest::default()),
            relevance_calls: Mutex::new(0),
            extract_calls: Mutex::new(0),
        }
    }

    /// Queue a field map; each extract_fields call consumes one. When the
    /// queue is empty, regex fallback extraction answers instead.
    pub fn with_fields(self, pairs: &[(&str, &str)]) -> Self {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.fields.lock().unwrap().push(FieldMap(map));
        self
    }

    pub fn with_intent(self, intent: MessageIntent) -> Self {
        *self.intent.lock().unwrap() = intent;
        self
    }

    pub fn with_new_entry(self, flag: bool) -> Self {
        *self.new_entry.lock().unwrap() = flag;
        self
    }

    pub fn with_entries(self, entries: &[(u32, &str)], confidence: f64) -> Self {
        *self.multi.lock().unwrap() = MultiEntryDetection {
            is_multiple: entries.len() > 1,
            entries: entries
                .iter()
                .map(|(quantity, name)| DetectedEntry {
                    quantity: *quantity,
                    name: name.to_string(),
                })
                .collect(),
            confidence,
        };
        self
    }

    pub fn with_relevance(self, relevant: bool, confidence: f64) -> Self {
        *self.relevance.lock().unwrap() = RelevanceBehavior::Parsed(RelevanceVerdict {
            relevant,
            confidence,
            reason: "mock".into(),
            context_switch: false,
        });
        self
    }

    pub fn with_unparseable_relevance(self) -> Self {
        *self.relevance.lock().unwrap() = RelevanceBehavior::Unparseable;
        self
    }

    pub fn with_failing_relevance(self) -> Self {
        *self.relevance.lock().unwrap() = RelevanceBehavior::Fail;
        self
    }

    pub fn with_modification(self, modification: ModificationRequest) -> Self {
        *self.modification.lock().unwrap() = modification;
        self
    }

    pub fn relevance_calls(&self) -> u32 {
        *self.relevance_calls.lock().unwrap()
    }

    pub fn extract_calls(&self) -> u32 {
        *self.extract_calls.lock().unwrap()
    }
}

#[async_trait]
impl ModelClient for MockModel {
    async fn extract_fields(&self, text: &str, reference: NaiveDateTime) -> Result<FieldMap, LlmError> {
        *self.extract_calls.lock().unwrap() += 1;
        let mut queued = self.fields.lock().unwrap();
        if queued.is_empty() {
            Ok(FieldMap::fallback_from_text(text, reference))
        } else {
            Ok(queued.remove(0))
        }
    }

    async fn classify_intent(&self, _text: &str) -> Result<MessageIntent, LlmError> {
        Ok(*self.intent.lock().unwrap())
    }

    async fn detect_new_entry_start(&self, _text: &str, _context: &str) -> Result<bool, LlmError> {
        Ok(*self.new_entry.lock().unwrap())
    }

    async fn detect_multiple_entries(&self, _text: &str) -> Result<MultiEntryDetection, LlmError> {
        Ok(self.multi.lock().unwrap().clone())
    }

    async fn analyze_context_relevance(&self, _text: &str, _context: &str) -> Result<ParsedVerdict, LlmError> {
        *self.relevance_calls.lock().unwrap() += 1;
        match &*self.relevance.lock().unwrap() {
            RelevanceBehavior::Parsed(v) => Ok(ParsedVerdict::Parsed(v.clone())),
            RelevanceBehavior::Unparseable => Ok(ParsedVerdict::Unparseable("not json".into())),
            RelevanceBehavior::Fail => Err(LlmError::InvalidResponse("mock failure".into())),
        }
    }

    async fn extract_modification(
        &self,
        _original: &ScheduledRecord,
        _text: &str,
    ) -> Result<ModificationRequest, LlmError> {
        Ok(self.modification.lock().unwrap().clone())
    }
}
