//! Rate limiting and retries for outbound tracker calls.
//!
//! [`RateLimiter`] keeps an optimistic, in-process copy of the tracker's
//! quota and only goes back to the network when a bucket looks exhausted or
//! its reset time has passed. [`retry_request`] re-runs a failing call with
//! fixed or exponential backoff.

use std::future::Future;
use std::time::Duration;

use jiff::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transport::{Bucket, RateLimitSnapshot};

/// Extra time slept past a bucket's reset, to absorb clock skew.
pub const RESET_MARGIN: Duration = Duration::from_secs(2);

/// Fixed pause after GitHub reports a secondary (abuse) rate limit.
pub const SECONDARY_LIMIT_SLEEP: Duration = Duration::from_secs(60);

/// Retry configuration for one class of calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    #[serde(default = "default_tries")]
    pub tries: u32,

    /// Base delay between attempts
    #[serde(default = "default_delay", with = "duration_secs")]
    pub delay: Duration,

    /// Double the delay after every failed attempt
    #[serde(default = "default_exponential")]
    pub exponential: bool,
}

fn default_tries() -> u32 {
    3
}

fn default_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_exponential() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: default_tries(),
            delay: default_delay(),
            exponential: default_exponential(),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            tries: 1,
            delay: Duration::ZERO,
            exponential: false,
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.exponential {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.delay.saturating_mul(factor)
        } else {
            self.delay
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Run `op` until it succeeds or `policy.tries` attempts have failed.
///
/// The last failure is returned unchanged.
pub async fn retry_request<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let tries = policy.tries.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < tries => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "{operation} failed (attempt {attempt}/{tries}), retrying in {:?}: {e}",
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Client-side view of the tracker's rate limits.
#[derive(Debug, Default)]
pub struct RateLimiter {
    snapshot: Mutex<Option<RateLimitSnapshot>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current optimistic snapshot, if one has been fetched.
    pub fn snapshot(&self) -> Option<RateLimitSnapshot> {
        self.snapshot.lock().clone()
    }

    /// Wait until `bucket` has room for one more call, then account for it.
    ///
    /// `fetch` retrieves a fresh snapshot from the tracker. It is called
    /// lazily on first use, when the bucket's reset time has passed, and once
    /// more when the bucket looks exhausted. If the bucket is still exhausted
    /// after that refetch, this sleeps until the reset plus [`RESET_MARGIN`].
    pub async fn wait_for_capacity<F, Fut>(&self, bucket: Bucket, fetch: F) -> Result<()>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<RateLimitSnapshot>>,
    {
        if self.needs_fetch(bucket) {
            self.store(fetch().await?);
        }
        if self.try_consume(bucket) {
            return Ok(());
        }

        tracing::debug!("{bucket} rate limit looks exhausted, refetching");
        self.store(fetch().await?);
        if self.try_consume(bucket) {
            return Ok(());
        }

        let wait = self.time_until_reset(bucket) + RESET_MARGIN;
        tracing::warn!("{bucket} rate limit exhausted, sleeping {:?}", wait);
        tokio::time::sleep(wait).await;

        // The bucket has reset; start over from the tracker's numbers.
        *self.snapshot.lock() = None;
        Ok(())
    }

    fn store(&self, snapshot: RateLimitSnapshot) {
        *self.snapshot.lock() = Some(snapshot);
    }

    fn needs_fetch(&self, bucket: Bucket) -> bool {
        match self.snapshot.lock().as_ref() {
            None => true,
            Some(snapshot) => snapshot
                .get(bucket)
                .is_some_and(|status| status.reset_at <= Timestamp::now()),
        }
    }

    fn try_consume(&self, bucket: Bucket) -> bool {
        let mut guard = self.snapshot.lock();
        let Some(snapshot) = guard.as_mut() else {
            return false;
        };

        match snapshot.get_mut(bucket) {
            // Buckets the tracker doesn't report are not limited.
            None => true,
            Some(status) if status.remaining > 0 => {
                status.remaining -= 1;
                status.used += 1;
                true
            }
            Some(_) => false,
        }
    }

    fn time_until_reset(&self, bucket: Bucket) -> Duration {
        let reset_at = self
            .snapshot
            .lock()
            .as_ref()
            .and_then(|snapshot| snapshot.get(bucket).map(|status| status.reset_at));

        let Some(reset_at) = reset_at else {
            return Duration::ZERO;
        };

        let millis = reset_at.as_millisecond() - Timestamp::now().as_millisecond();
        Duration::from_millis(millis.max(0) as u64)
    }
}
