//! Calendar integration seam
//!
//! The saga coordinator and edit orchestrator drive external calendar state
//! through this trait. Expired authorization is its own variant because the
//! saga treats it differently from any other failure.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::ScheduledRecord;

pub use http::HttpCalendarClient;

/// Errors from calendar operations
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The user's calendar authorization has expired and must be renewed
    /// out of band
    #[error("Calendar authorization expired")]
    AuthExpired,

    #[error("Calendar API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid calendar response: {0}")]
    InvalidResponse(String),
}

/// External calendar operations
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Create an event for the record and return the provider's event id
    async fn create_event(&self, record: &ScheduledRecord) -> Result<String, CalendarError>;

    /// Invite an attendee to an existing event. Returns whether the
    /// provider accepted the invitation request.
    async fn invite(&self, event_id: &str, email: &str) -> Result<bool, CalendarError>;

    /// Delete an event. Deleting an already-deleted event is not an error.
    async fn delete_event(&self, event_id: &str) -> Result<(), CalendarError>;
}
