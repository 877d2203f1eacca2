//! Bounded exponential backoff for price requests.

use std::time::Duration;

use bertrand_config::RetryConfig;
use bertrand_core::error::{AgentError, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per request, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Deadline for a single price request
    pub request_timeout: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2×base, 4×base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay before retrying after `error`, honoring a provider's rate-limit hint.
    pub fn delay_after(&self, attempt: u32, error: &AgentError) -> Duration {
        let backoff = self.delay_for(attempt);
        match error {
            AgentError::Provider(ProviderError::RateLimited { retry_after_secs }) => backoff
                .max(Duration::from_secs(*retry_after_secs))
                .min(self.max_delay),
            _ => backoff,
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(error: &AgentError) -> bool {
        !matches!(
            error,
            AgentError::Provider(
                ProviderError::AuthenticationFailed(_) | ProviderError::NotConfigured(_)
            )
        )
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}
