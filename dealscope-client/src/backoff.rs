//! Retry schedule for upstream calls

use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

/// Exponential backoff with optional random jitter
///
/// Attempt numbers are 1-based: the wait after attempt `n` is
/// `base_delay * 2^(n-1)`, plus up to `max_jitter` when jitter applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts allowed for one logical request
    pub max_attempts: u32,
    /// Wait after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random jitter added to throttling waits
    pub max_jitter: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// Whether another attempt may follow attempt `attempt`
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Wait after failed attempt `attempt`, without jitter
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Wait after failed attempt `attempt`, with random jitter added
    pub fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
        };
        self.delay(attempt) + jitter
    }

    /// Statuses that signal throttling or a transient server fault
    pub fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), Duration::from_millis(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(1000));
        assert_eq!(policy.delay(2), Duration::from_millis(2000));
        assert_eq!(policy.delay(3), Duration::from_millis(4000));
        assert!(policy.can_retry(1));
        assert!(policy.can_retry(2));
        assert!(!policy.can_retry(3));
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = BackoffPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay_with_jitter(2);
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay < Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_zero_jitter() {
        let policy = BackoffPolicy::new(3, Duration::from_millis(5), Duration::ZERO);
        assert_eq!(policy.delay_with_jitter(1), Duration::from_millis(5));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(BackoffPolicy::is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(BackoffPolicy::is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(BackoffPolicy::is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!BackoffPolicy::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!BackoffPolicy::is_retryable_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_at_least_one_attempt() {
        let policy = BackoffPolicy::new(0, Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert!(!policy.can_retry(1));
    }
}
