//! Notification channel seam
//!
//! Outbound sending only; inbound transport plumbing lives outside this
//! crate and feeds the dispatcher entry points.

pub mod retry;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use retry::RetryingSender;

/// Errors from outbound channel sends
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },

    #[error("Channel closed")]
    Closed,
}

impl ChannelError {
    /// Transient errors are worth a bounded retry
    pub fn is_transient(&self) -> bool {
        match self {
            ChannelError::RateLimited { .. } => true,
            ChannelError::Network(_) => true,
            ChannelError::Api { code, .. } => *code >= 500,
            ChannelError::Closed => false,
        }
    }

    /// Server-provided retry hint, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ChannelError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// One inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Inline keyboard attached to an outbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn single_row(buttons: Vec<Button>) -> Self {
        Self { rows: vec![buttons] }
    }
}

/// Outbound message sender
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<(), ChannelError>;
}
