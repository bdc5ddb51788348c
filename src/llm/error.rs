//! Failure modes of the model service boundary
//!
//! Retryability lives on the error itself so the request loop stays a plain
//! loop: it asks the error whether another attempt makes sense and how long
//! to wait first.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limited, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("model service answered {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("response did not have the expected shape: {0}")]
    InvalidResponse(String),

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

impl LlmError {
    /// Whether another attempt could succeed. A malformed response is
    /// deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::InvalidResponse(_) => false,
        }
    }

    /// Server-mandated wait before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_retry_client_errors_do_not() {
        let server = LlmError::Api {
            status: 503,
            message: "unavailable".into(),
        };
        let client = LlmError::Api {
            status: 400,
            message: "bad request".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(!LlmError::InvalidResponse("not json".into()).is_retryable());
    }

    #[test]
    fn test_rate_limit_carries_the_wait() {
        let err = LlmError::RateLimited {
            retry_after: Duration::from_secs(7),
        };
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(LlmError::Timeout(Duration::from_secs(1)).retry_after(), None);
    }
}
