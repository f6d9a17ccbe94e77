//! Retrying topic
//!
//! Wraps a topic to retry failed publishes of a single message. Only
//! retryable errors are retried; [`PluginError::Cancelled`] and encode
//! failures return immediately. Dropping the publish future (as the
//! publisher does on cancellation) abandons any pending backoff.
//!
//! Backoff doubles per retry up to a cap. The jitter is derived from the
//! message payload, so events of one batch that fail together spread their
//! retries apart while a given message always backs off the same way.

use crate::error::PluginError;
use async_trait::async_trait;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry_gateway_core::{Topic, TopicMessage};
use tracing::{debug, warn};

/// How a [`RetryTopic`] retries one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff ceiling before the first retry
    pub base_delay: Duration,
    /// Backoff ceiling for any retry
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy allowing `max_retries` retries with default delays
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry `retry` (1-based) of `message`.
    ///
    /// Falls in the upper half of `base_delay * 2^(retry - 1)`, capped at
    /// `max_delay`.
    pub fn backoff(&self, message: &TopicMessage, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        let ceiling = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        let half = ceiling / 2;
        let spread = half.as_micros() as u64 + 1;
        half + Duration::from_micros(message_seed(message, retry) % spread)
    }
}

fn message_seed(message: &TopicMessage, retry: u32) -> u64 {
    let mut hasher = DefaultHasher::new();
    message.data.hash(&mut hasher);
    retry.hash(&mut hasher);
    hasher.finish()
}

/// Topic wrapper that retries failed publishes with exponential backoff
pub struct RetryTopic {
    inner: Arc<dyn Topic>,
    policy: RetryPolicy,
    retry_count: AtomicU64,
    recovered_count: AtomicU64,
}

impl RetryTopic {
    /// Wraps `inner` with `policy`
    pub fn new(inner: Arc<dyn Topic>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            retry_count: AtomicU64::new(0),
            recovered_count: AtomicU64::new(0),
        }
    }

    /// Wraps `inner` with the default policy
    pub fn with_defaults(inner: Arc<dyn Topic>) -> Self {
        Self::new(inner, RetryPolicy::default())
    }

    /// Total retry attempts
    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    /// Publishes that succeeded after at least one failure
    pub fn recovered_count(&self) -> u64 {
        self.recovered_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Topic for RetryTopic {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn publish(&self, message: &TopicMessage) -> Result<(), PluginError> {
        let mut retry = 0;
        loop {
            match self.inner.publish(message).await {
                Ok(()) => {
                    if retry > 0 {
                        self.recovered_count.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(());
                }
                Err(e) if e.is_retryable() && retry < self.policy.max_retries => {
                    retry += 1;
                    let delay = self.policy.backoff(message, retry);
                    self.retry_count.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        topic = self.inner.name(),
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if retry > 0 {
                        warn!(
                            topic = self.inner.name(),
                            retries = retry,
                            error = %e,
                            "Publish failed after retries"
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    async fn health(&self) -> bool {
        self.inner.health().await
    }

    async fn shutdown(&self) -> Result<(), PluginError> {
        self.inner.shutdown().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    /// Topic that fails N times with the given error, then succeeds
    struct FlakyTopic {
        failures: u32,
        error: PluginError,
        calls: AtomicU32,
    }

    impl FlakyTopic {
        fn new(failures: u32, error: PluginError) -> Self {
            Self {
                failures,
                error,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Topic for FlakyTopic {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn publish(&self, _: &TopicMessage) -> Result<(), PluginError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(self.error.clone())
            } else {
                Ok(())
            }
        }

        async fn health(&self) -> bool {
            true
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn message(data: &str) -> TopicMessage {
        TopicMessage::new(data.to_string())
    }

    // ==========================================================================
    // Backoff
    // ==========================================================================

    #[test]
    fn test_backoff_doubles_within_upper_half() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        let m = message(r#"{"event":{"id":"e1"}}"#);

        for (retry, ceiling) in [(1, 100), (2, 200), (3, 400), (4, 500), (9, 500)] {
            let delay = policy.backoff(&m, retry);
            let ceiling = Duration::from_millis(ceiling);
            assert!(delay >= ceiling / 2 && delay <= ceiling, "retry {retry}: {delay:?}");
        }
    }

    #[test]
    fn test_backoff_is_stable_per_message() {
        let policy = RetryPolicy::default();
        let m = message(r#"{"event":{"id":"e1"}}"#);
        assert_eq!(policy.backoff(&m, 2), policy.backoff(&m, 2));
    }

    #[test]
    fn test_backoff_spreads_a_batch() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(1),
            ..RetryPolicy::default()
        };
        let delays: std::collections::HashSet<Duration> = (0..20)
            .map(|i| policy.backoff(&message(&format!(r#"{{"event":{{"id":"e{i}"}}}}"#)), 1))
            .collect();
        assert!(delays.len() > 1);
    }

    #[test]
    fn test_backoff_survives_huge_retry_counts() {
        let policy = RetryPolicy::default();
        assert!(policy.backoff(&message("{}"), u32::MAX) <= policy.max_delay);
    }

    // ==========================================================================
    // Retrying
    // ==========================================================================

    #[tokio::test]
    async fn test_recovers_from_transient_failure() {
        let inner = Arc::new(FlakyTopic::new(2, PluginError::Publish("unavailable".into())));
        let retry = RetryTopic::new(inner.clone(), fast());

        retry.publish(&TopicMessage::new("{}")).await.unwrap();

        assert_eq!(inner.calls(), 3);
        assert_eq!(retry.retry_count(), 2);
        assert_eq!(retry.recovered_count(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error() {
        let inner = Arc::new(FlakyTopic::new(10, PluginError::Publish("unavailable".into())));
        let retry = RetryTopic::new(inner.clone(), fast());

        let err = retry.publish(&TopicMessage::new("{}")).await.unwrap_err();

        assert_eq!(err, PluginError::Publish("unavailable".into()));
        assert_eq!(inner.calls(), 4);
        assert_eq!(retry.retry_count(), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_cancelled_or_encode() {
        for error in [PluginError::Cancelled, PluginError::Encode("bad".into())] {
            let inner = Arc::new(FlakyTopic::new(1, error.clone()));
            let retry = RetryTopic::new(inner.clone(), fast());

            assert_eq!(retry.publish(&TopicMessage::new("{}")).await, Err(error));
            assert_eq!(inner.calls(), 1);
            assert_eq!(retry.retry_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_name_and_health_delegate() {
        let retry = RetryTopic::with_defaults(Arc::new(FlakyTopic::new(0, PluginError::NotReady)));
        assert_eq!(retry.name(), "flaky");
        assert!(retry.health().await);
    }

    #[tokio::test]
    async fn test_zero_retries_publishes_once() {
        let inner = Arc::new(FlakyTopic::new(1, PluginError::Publish("unavailable".into())));
        let retry = RetryTopic::new(inner.clone(), RetryPolicy::with_max_retries(0));

        assert!(retry.publish(&TopicMessage::new("{}")).await.is_err());
        assert_eq!(inner.calls(), 1);
        assert_eq!(retry.retry_count(), 0);
    }
}
