//! Connection retry with exponential backoff and jitter.
//!
//! Used only while establishing the upstream connection. Once a run's body
//! has started streaming, a failure is terminal for that run.

use std::future::Future;
use std::time::Duration;

use crate::error::BridgeError;

/// How many times, and how patiently, to try establishing a connection.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Default backoff with a custom attempt budget.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Un-jittered delay before retry number `retry` (0-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(retry.min(i32::MAX as u32) as i32);
        Duration::try_from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Run `connect` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// Only errors for which [`BridgeError::is_retryable`] holds are retried;
    /// the last error is returned when attempts are exhausted.
    pub async fn execute<F, Fut, T>(&self, mut connect: F) -> Result<T, BridgeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
    {
        if self.max_attempts == 0 {
            return Err(BridgeError::unavailable("no connection attempts configured"));
        }

        let mut attempt = 1;
        loop {
            let err = match connect().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= self.max_attempts {
                return Err(err);
            }

            let delay = jittered(self.backoff_for(attempt - 1));
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                code = %err.code(),
                error = %err,
                "Retrying upstream connection"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// 75%-125% of `backoff`.
fn jittered(backoff: Duration) -> Duration {
    Duration::from_secs_f64(backoff.as_secs_f64() * (0.75 + rand_factor() * 0.5))
}

/// Pseudo-random factor in [0, 1) without pulling in the rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    (hasher.finish() % 10_000) as f64 / 10_000.0
}
