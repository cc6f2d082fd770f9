use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategy::{BackoffStrategy, JitterStrategy};

/// Bounded retry policy for a single remote call.
///
/// Consumed by the generic retry helper of the control loop; the policy only describes attempts and delays, it never sleeps itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Base delay used by the backoff strategy.
    pub base_delay_ms: u64,
    pub backoff: BackoffStrategy,
    #[serde(default)]
    pub jitter: JitterStrategy,
}

impl RetryPolicy {
    /// Linear backoff without jitter: waits `base * n` after the `n`-th failure.
    pub fn linear(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: base.as_millis() as u64,
            backoff: BackoffStrategy::Linear,
            jitter: JitterStrategy::None,
        }
    }

    /// Constant delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: delay.as_millis() as u64,
            backoff: BackoffStrategy::Fixed,
            jitter: JitterStrategy::None,
        }
    }

    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Replace the jitter strategy.
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Effective number of attempts (at least one).
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the `attempt`-th failure (1-based), before jitter.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base = self.base_delay_ms;
        let ms = match self.backoff {
            BackoffStrategy::Fixed => base,
            BackoffStrategy::Linear => base.saturating_mul(attempt as u64),
            BackoffStrategy::Exponential { factor, max_ms } => {
                let grown = base as f64 * factor.max(1.0).powi(attempt as i32 - 1);
                if grown.is_finite() {
                    (grown as u64).min(max_ms)
                } else {
                    max_ms
                }
            }
        };
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    /// Three attempts, linear backoff from two seconds.
    fn default() -> Self {
        Self::linear(3, Duration::from_secs(2))
    }
}
