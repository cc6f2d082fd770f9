//! Generic async retry driven by a [`RetryPolicy`] value.
use std::{fmt::Display, future::Future, time::Duration};

use rand::Rng;
use tracing::{debug, warn};

use retro_model::{JitterStrategy, RetryPolicy};

/// Run `op` until it succeeds or the policy's attempts are exhausted.
///
/// `op` receives the 1-based attempt number. Sleeps only between attempts, never after the last one; the last error is returned as is.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < attempts => {
                let delay = apply_jitter(policy.delay_after(attempt), policy.jitter);
                warn!(
                    operation,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    operation,
                    attempt,
                    max_attempts = attempts,
                    error = %e,
                    "attempt failed; giving up"
                );
                return Err(e);
            }
        }
    }
}

/// Spread `delay` according to `jitter`.
pub fn apply_jitter(delay: Duration, jitter: JitterStrategy) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return delay;
    }
    let mut rng = rand::thread_rng();
    match jitter {
        JitterStrategy::None => delay,
        JitterStrategy::Full => Duration::from_millis(rng.gen_range(0..=ms)),
        JitterStrategy::Equal => {
            let half = ms / 2;
            Duration::from_millis(half + rng.gen_range(0..=ms - half))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn sleeps_linearly_between_attempts_only() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let res: Result<(), String> = retry(&policy, "test", |attempt| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("boom {attempt}"))
            }
        })
        .await;

        assert_eq!(res.unwrap_err(), "boom 3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 2s after the first failure, 4s after the second, none after the last.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success() {
        let policy = RetryPolicy::default();
        let start = Instant::now();

        let res: Result<u32, String> = retry(&policy, "test", |attempt| async move {
            if attempt < 2 {
                Err("not yet".to_string())
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(res.unwrap(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..200 {
            assert!(apply_jitter(base, JitterStrategy::Full) <= base);
            let eq = apply_jitter(base, JitterStrategy::Equal);
            assert!(eq >= Duration::from_millis(500) && eq <= base);
        }
        assert_eq!(apply_jitter(base, JitterStrategy::None), base);
        assert_eq!(apply_jitter(Duration::ZERO, JitterStrategy::Full), Duration::ZERO);
    }
}
