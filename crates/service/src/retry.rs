use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::errors::ServiceError;

/// Bounded exponential backoff for registry compare-and-swap writes.
///
/// Only [`ServiceError::VersionConflict`] is retryable; every other error is
/// final on first occurrence.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff_base, backoff_max }
    }

    /// Single attempt, no waiting: the write either lands or the request fails.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn from_config(cfg: &configs::RegistryConfig) -> Self {
        Self::new(
            cfg.max_attempts,
            Duration::from_millis(cfg.backoff_base_ms),
            Duration::from_millis(cfg.backoff_max_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt` is the number of attempts already made.
    pub fn should_retry(&self, attempt: u32, error: &ServiceError) -> bool {
        if !error.is_version_conflict() {
            return false;
        }
        if attempt >= self.max_attempts {
            debug!("Max retry attempts ({}) reached", self.max_attempts);
            return false;
        }
        true
    }

    pub fn backoff_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt - 1);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }

    pub async fn wait_before_retry(&self, attempt: u32) {
        let backoff = self.backoff_for(attempt);
        if backoff.is_zero() {
            return;
        }
        debug!("Retrying in {:?} (attempt {})", backoff, attempt);
        sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> ServiceError {
        ServiceError::VersionConflict { path: "users.json".into() }
    }

    #[test]
    fn only_version_conflicts_are_retryable() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5));
        assert!(policy.should_retry(1, &conflict()));
        assert!(policy.should_retry(2, &conflict()));
        assert!(!policy.should_retry(3, &conflict()));
        assert!(!policy.should_retry(1, &ServiceError::Conflict("userId already taken".into())));
        assert!(!policy.should_retry(1, &ServiceError::Upstream { status: 502, body: String::new() }));
    }

    #[test]
    fn no_retry_policy_stops_after_first_attempt() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(1, &conflict()));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(250));
        assert_eq!(policy.backoff_for(0), Duration::ZERO);
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(250));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn zero_backoff_does_not_sleep() {
        let policy = RetryPolicy::no_retry();
        let start = std::time::Instant::now();
        policy.wait_before_retry(3).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
