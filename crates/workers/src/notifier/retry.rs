use std::time::Duration;

use async_trait::async_trait;

use super::channel::{Notifier, NotifyError};
use super::payload::AlertPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(10),
        }
    }
}

impl DeliveryPolicy {
    pub fn single_attempt(self) -> Self {
        Self { attempts: 1, ..self }
    }

    /// Wait after the `attempt`-th failure (1-based): base * 2^(attempt-1), capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

pub struct RetryNotifier<N: Notifier> {
    inner: N,
    policy: DeliveryPolicy,
}

impl<N: Notifier> RetryNotifier<N> {
    pub fn new(inner: N, policy: DeliveryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<N: Notifier> Notifier for RetryNotifier<N> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.inner.send(payload).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_permanent() || attempt >= attempts => return Err(e),
                Err(e) => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        channel = self.inner.name(),
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "delivery failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
