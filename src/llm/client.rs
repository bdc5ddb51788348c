//! ModelClient trait
//!
//! The seam between the conversation engine and the external model service.
//! Implementations are opaque RPC adapters; the engine only sees the typed
//! result contracts.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::error::LlmError;
use super::types::{FieldMap, MultiEntryDetection, ParsedVerdict};
use crate::domain::{MessageIntent, ModificationRequest, ScheduledRecord};

/// Calls to the external model/classification service
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Turn raw text into a field map, resolving relative dates against
    /// `reference`
    async fn extract_fields(&self, text: &str, reference: NaiveDateTime) -> Result<FieldMap, LlmError>;

    /// Classify the global intent of a message
    async fn classify_intent(&self, text: &str) -> Result<MessageIntent, LlmError>;

    /// Detect whether a message mid-flow looks like the start of an
    /// unrelated new record
    async fn detect_new_entry_start(&self, text: &str, context: &str) -> Result<bool, LlmError>;

    /// Detect compound "N X and M Y" style input
    async fn detect_multiple_entries(&self, text: &str) -> Result<MultiEntryDetection, LlmError>;

    /// Judge relevance of a message to the active conversation context
    async fn analyze_context_relevance(&self, text: &str, context: &str) -> Result<ParsedVerdict, LlmError>;

    /// Derive a sparse modification request from free text against the
    /// original record
    async fn extract_modification(
        &self,
        original: &ScheduledRecord,
        text: &str,
    ) -> Result<ModificationRequest, LlmError>;
}
