//! Retry decorator for outbound sends
//!
//! Bounded exponential backoff with jitter, honoring any server-provided
//! retry-after hint. Wraps any ChannelSender instead of inlining retry loops
//! at every call site.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChannelError, ChannelSender, Keyboard};

/// Default number of attempts (first try included)
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay between attempts
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// ChannelSender wrapper adding bounded exponential backoff
pub struct RetryingSender<S> {
    inner: S,
    max_attempts: u32,
    base_delay: Duration,
}

impl<S: ChannelSender> RetryingSender<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }

    pub fn with_policy(inner: S, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn backoff(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint;
        }
        let exp = self.base_delay * 2u32.pow(attempt);
        // up to 10% jitter so concurrent chats don't retry in lockstep
        let jitter = rand::rng().random_range(0..=exp.as_millis() as u64 / 10);
        exp + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl<S: ChannelSender> ChannelSender for RetryingSender<S> {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<(), ChannelError> {
        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let hint = last_error.as_ref().and_then(ChannelError::retry_after);
                let delay = self.backoff(attempt - 1, hint);
                warn!(chat_id, attempt, delay_ms = delay.as_millis() as u64, "Retrying send");
                tokio::time::sleep(delay).await;
            }

            match self.inner.send(chat_id, text, keyboard.clone()).await {
                Ok(()) => {
                    debug!(chat_id, attempt, "Message sent");
                    return Ok(());
                }
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_error.unwrap_or(ChannelError::Closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails the first `failures` sends, then succeeds
    struct FlakySender {
        failures: Mutex<u32>,
        calls: Mutex<u32>,
        error: fn() -> ChannelError,
    }

    impl FlakySender {
        fn new(failures: u32, error: fn() -> ChannelError) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: Mutex::new(0),
                error,
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChannelSender for FlakySender {
        async fn send(&self, _chat_id: i64, _text: &str, _keyboard: Option<Keyboard>) -> Result<(), ChannelError> {
            *self.calls.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err((self.error)());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let sender = RetryingSender::with_policy(
            FlakySender::new(2, || ChannelError::Network("reset".into())),
            3,
            Duration::from_millis(1),
        );
        assert!(sender.send(1, "hola", None).await.is_ok());
        assert_eq!(sender.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sender = RetryingSender::with_policy(
            FlakySender::new(10, || ChannelError::Network("reset".into())),
            3,
            Duration::from_millis(1),
        );
        assert!(sender.send(1, "hola", None).await.is_err());
        assert_eq!(sender.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let sender = RetryingSender::with_policy(
            FlakySender::new(10, || ChannelError::Api {
                code: 403,
                message: "forbidden".into(),
            }),
            3,
            Duration::from_millis(1),
        );
        assert!(sender.send(1, "hola", None).await.is_err());
        assert_eq!(sender.inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_honors_retry_after_hint() {
        let sender = RetryingSender::with_policy(
            FlakySender::new(1, || ChannelError::RateLimited {
                retry_after: Some(Duration::from_millis(5)),
            }),
            3,
            Duration::from_millis(1),
        );
        let start = std::time::Instant::now();
        assert!(sender.send(1, "hola", None).await.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
