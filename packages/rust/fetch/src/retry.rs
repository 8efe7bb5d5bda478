//! Retry policy and the clock it sleeps on.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use companyintel_shared::FetchConfig;

/// Upper bound for a server-provided `Retry-After`.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of wall-clock time and sleeps.
///
/// Production code uses [`SystemClock`]; tests inject a [`ManualClock`] so
/// backoff and freshness are deterministic.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    async fn sleep(&self, duration: Duration);
}

/// Real time, real sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Test clock: sleeps return immediately, advance `now`, and are recorded.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
        if let Ok(step) = chrono::Duration::from_std(duration) {
            self.advance(step);
        }
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier per further retry.
    pub factor: f64,
    /// Which HTTP statuses are worth another attempt.
    pub retryable_status: fn(u16) -> bool,
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        self.base_delay.mul_f64(self.factor.max(1.0).powi(exponent))
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        (self.retryable_status)(status)
    }

    /// Combine the computed backoff with a server `Retry-After`, capped.
    pub fn delay_with_hint(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.delay_for(retry);
        match retry_after {
            Some(hint) => computed.max(hint.min(MAX_RETRY_AFTER)),
            None => computed,
        }
    }
}

/// 429 and every 5xx.
pub fn default_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_retries.saturating_add(1),
            base_delay: config.backoff_base,
            factor: config.backoff_factor,
            retryable_status: default_retryable_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            factor: 2.0,
            retryable_status: default_retryable_status,
        }
    }

    #[test]
    fn backoff_is_exponential() {
        let p = policy();
        assert_eq!(p.delay_for(1), Duration::from_millis(500));
        assert_eq!(p.delay_for(2), Duration::from_millis(1000));
        assert_eq!(p.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn retryable_statuses() {
        let p = policy();
        assert!(p.is_retryable(429));
        assert!(p.is_retryable(500));
        assert!(p.is_retryable(503));
        assert!(!p.is_retryable(404));
        assert!(!p.is_retryable(403));
    }

    #[test]
    fn retry_after_hint_is_capped() {
        let p = policy();
        assert_eq!(
            p.delay_with_hint(1, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(
            p.delay_with_hint(1, Some(Duration::from_secs(3600))),
            MAX_RETRY_AFTER
        );
        assert_eq!(
            p.delay_with_hint(2, Some(Duration::from_millis(10))),
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn policy_from_fetch_config() {
        let p = RetryPolicy::from(&FetchConfig::default());
        assert_eq!(p.max_attempts, 4);
        assert_eq!(p.base_delay, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn manual_clock_records_sleeps_and_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.sleep(Duration::from_secs(2)).await;
        clock.sleep(Duration::from_secs(3)).await;
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(2), Duration::from_secs(3)]
        );
        assert_eq!(clock.now() - start, chrono::Duration::seconds(5));
    }
}
