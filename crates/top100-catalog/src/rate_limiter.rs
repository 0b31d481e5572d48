// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{CatalogError, Result};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Pacing and backoff policy for catalog API calls.
///
/// Spotify's Web API tolerates roughly ten requests per second for a client
/// credentials token. The limiter keeps the timestamp of the last admitted
/// request behind a mutex, so clones share one pacing window and the ceiling
/// holds even if lookups are ever issued from several tasks.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    max_retries: u32,
    base_delay_ms: u64,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a rate limiter.
    ///
    /// # Arguments
    /// * `requests_per_second` - Ceiling on admitted requests; 0 disables pacing.
    /// * `max_retries` - Highest attempt number [`retry_delay`](Self::retry_delay) accepts.
    /// * `base_delay_ms` - Backoff before the second attempt, doubled for each later one.
    pub fn new(requests_per_second: u32, max_retries: u32, base_delay_ms: u64) -> Self {
        let min_interval = if requests_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / f64::from(requests_per_second))
        };

        Self {
            min_interval,
            max_retries,
            base_delay_ms,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Spotify defaults: 10 requests per second, 5 attempts, 500ms base delay.
    pub fn spotify_default() -> Self {
        Self::new(10, 5, 500)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request can be made according to the rate limit.
    ///
    /// The first call never waits.
    pub async fn throttle(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_instant) = *last {
            let elapsed = last_instant.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::trace!(
                    target: "rate_limiter",
                    "rate limiting: waiting {:?}",
                    wait_time
                );
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Backoff in milliseconds before retrying after failed attempt `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Result<u64> {
        self.retry_delay_with(attempt, &mut rand::thread_rng())
    }

    /// [`retry_delay`](Self::retry_delay) with a caller-supplied random source.
    ///
    /// `base_delay_ms * 2^(attempt - 1)`, perturbed uniformly by up to ±25%
    /// and floored at zero.
    pub fn retry_delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Result<u64> {
        if attempt > self.max_retries {
            return Err(CatalogError::AttemptsExceeded {
                attempt,
                max_retries: self.max_retries,
            });
        }

        let exponent = attempt.saturating_sub(1);
        let delay = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(i64::MAX as u64) as i64;

        let jitter = (delay as f64 * 0.25) as i64;
        let offset = if jitter > 0 {
            rng.gen_range(-jitter..=jitter)
        } else {
            0
        };

        Ok(delay.saturating_add(offset).max(0) as u64)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::spotify_default()
    }
}
