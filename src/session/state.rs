//! Per-chat conversation state

use serde::{Deserialize, Serialize};

use crate::domain::{BatchContext, ModificationRequest, PendingField, ScheduledRecord};

/// What the conversation is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// No active task
    #[default]
    None,
    /// A new record is being built
    Registering,
    /// An existing record is being edited
    Modifying,
    /// Waiting for a reply to a specific field prompt
    FieldWizard,
    /// Waiting for yes/no on a summary
    Confirming,
    /// Producing a listing of upcoming records
    Reporting,
    /// Cancellation in progress
    Canceling,
}

impl ContextType {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::None => "sin tarea activa",
            Self::Registering => "registrando una cirugía nueva",
            Self::Modifying => "modificando una cirugía existente",
            Self::FieldWizard => "completando campos de un registro",
            Self::Confirming => "esperando confirmación de un registro",
            Self::Reporting => "generando un listado",
            Self::Canceling => "cancelando la tarea actual",
        }
    }
}

/// Full state of one chat's conversation
///
/// Exactly one exists per chat id, owned by the registry; a turn mutates it
/// while holding the chat's lock.
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    pub chat_id: i64,
    pub context: ContextType,
    /// The record being built, when registering
    pub record: Option<ScheduledRecord>,
    /// Field the wizard is currently waiting for
    pub pending_field: Option<PendingField>,
    /// Failed parse attempts for the pending field
    pub field_attempts: u32,
    /// Batch metadata when a compound message was split
    pub batch: Option<BatchContext>,
    /// Per-entry records built from a split, awaiting one combined yes/no
    pub batch_records: Vec<ScheduledRecord>,
    /// Modification awaiting yes/no: (record id, patch)
    pub pending_modification: Option<(i64, ModificationRequest)>,
    /// Search candidates awaiting disambiguation, plus the edit request text
    pub pending_candidates: Vec<ScheduledRecord>,
    pub pending_edit_text: Option<String>,
    /// Message that deviated from the active task, stashed until the user
    /// picks continue or start-new
    pub stashed_message: Option<String>,
    /// Calendar event waiting for an invite email
    pub pending_invite_event: Option<String>,
}

impl ConversationSession {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        self.context == ContextType::None
    }

    /// Short description of the active task, fed to the relevance classifier
    pub fn context_summary(&self) -> String {
        let mut summary = self.context.describe().to_string();
        if let Some(field) = self.pending_field {
            summary.push_str(&format!(", esperando {}", field.human_name()));
        }
        if let Some(record) = &self.record
            && let Some(procedure) = &record.procedure
        {
            summary.push_str(&format!(", cirugía {procedure}"));
        }
        summary
    }

    /// Drop every piece of uncommitted state. Committed saga steps are
    /// untouched by design: cancel is cooperative, not transactional.
    pub fn cancel(&mut self) {
        let chat_id = self.chat_id;
        *self = Self::new(chat_id);
    }
}
