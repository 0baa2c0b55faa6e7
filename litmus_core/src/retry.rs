//! Bounded polling with exponential backoff.
//!
//! Verification steps often depend on a side effect produced by a background
//! subsystem that exposes no completion callback. [`poll_until`] checks a
//! condition immediately and then re-checks it after doubling delays until it
//! holds or the attempt budget runs out.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::clock::Clock;
use crate::config::{millis, option_millis};

/// Configuration for backoff polling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Total number of condition checks, including the first one
    pub max_attempts: u32,
    /// Delay before the first re-check
    #[serde(rename = "initial_delay_ms", with = "millis")]
    pub initial_delay: Duration,
    /// Factor applied to the delay after every re-check
    pub multiplier: u32,
    /// Optional cap on a single delay
    #[serde(rename = "max_delay_ms", with = "option_millis")]
    pub max_delay: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(1),
            multiplier: 2,
            max_delay: None,
        }
    }
}

impl BackoffPolicy {
    /// Creates a doubling policy with the given budget and first delay.
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            ..Self::default()
        }
    }

    /// Sets the delay cap.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Number of checks actually performed; a zero budget still checks once.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay slept before the `retry`-th re-check (1-based).
    ///
    /// With the default policy this is `2^(retry - 1)` milliseconds.
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = self.multiplier.saturating_pow(exponent);
        let delay = self.initial_delay.saturating_mul(factor);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Total time slept by a poll whose condition never holds.
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.effective_attempts())
            .map(|retry| self.delay_before_retry(retry))
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}

/// Result of a bounded poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition held on check number `attempts`
    Satisfied { attempts: u32, elapsed: Duration },
    /// Every check failed
    Exhausted { attempts: u32, elapsed: Duration },
}

impl PollOutcome {
    /// True if the condition eventually held.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    /// Number of checks performed.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Satisfied { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Clock time spent polling.
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Satisfied { elapsed, .. } | Self::Exhausted { elapsed, .. } => *elapsed,
        }
    }
}

/// Polls `condition` until it returns true or the budget is spent.
///
/// The first check happens before any sleep. After each failed check the
/// remaining budget is decremented; when it reaches zero the poll gives up,
/// otherwise it sleeps on `clock` and the next delay is multiplied.
pub async fn poll_until<F, Fut>(clock: &dyn Clock, policy: &BackoffPolicy, mut condition: F) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = clock.now();
    let mut remaining = policy.effective_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;
        if condition().await {
            return PollOutcome::Satisfied {
                attempts,
                elapsed: clock.now().saturating_sub(start),
            };
        }

        remaining -= 1;
        if remaining == 0 {
            tracing::debug!("Condition still unmet after {} attempts", attempts);
            return PollOutcome::Exhausted {
                attempts,
                elapsed: clock.now().saturating_sub(start),
            };
        }

        let delay = policy.delay_before_retry(attempts);
        tracing::trace!("Attempt {} unmet, retrying in {:?}", attempts, delay);
        clock.sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::cell::Cell;

    #[test]
    fn test_default_policy() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.initial_delay, Duration::from_millis(1));
        assert_eq!(policy.multiplier, 2);
    }

    #[test]
    fn test_delay_doubles() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_before_retry(1), Duration::from_millis(1));
        assert_eq!(policy.delay_before_retry(2), Duration::from_millis(2));
        assert_eq!(policy.delay_before_retry(3), Duration::from_millis(4));
        assert_eq!(policy.delay_before_retry(9), Duration::from_millis(256));
    }

    #[test]
    fn test_delay_cap() {
        let policy = BackoffPolicy::default().with_max_delay(Duration::from_millis(8));
        assert_eq!(policy.delay_before_retry(4), Duration::from_millis(8));
        assert_eq!(policy.delay_before_retry(9), Duration::from_millis(8));
    }

    #[test]
    fn test_worst_case_wait() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.worst_case_wait(), Duration::from_millis(511));

        let single = BackoffPolicy::new(1, Duration::from_millis(50));
        assert_eq!(single.worst_case_wait(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_first_check_passes_without_sleep() {
        let clock = ManualClock::new();
        let outcome = poll_until(&clock, &BackoffPolicy::default(), || async { true }).await;

        assert_eq!(outcome.attempts(), 1);
        assert!(outcome.is_satisfied());
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_budget() {
        let clock = ManualClock::new();
        let checks = Cell::new(0u32);
        let outcome = poll_until(&clock, &BackoffPolicy::default(), || {
            checks.set(checks.get() + 1);
            async { false }
        })
        .await;

        assert!(!outcome.is_satisfied());
        assert_eq!(outcome.attempts(), 10);
        assert_eq!(checks.get(), 10);

        let expected: Vec<Duration> = (0..9).map(|k| Duration::from_millis(1 << k)).collect();
        assert_eq!(clock.sleeps(), expected);
        assert_eq!(outcome.elapsed(), Duration::from_millis(511));
    }

    #[tokio::test]
    async fn test_zero_budget_checks_once() {
        let clock = ManualClock::new();
        let policy = BackoffPolicy::new(0, Duration::from_millis(1));
        let outcome = poll_until(&clock, &policy, || async { false }).await;

        assert_eq!(outcome.attempts(), 1);
        assert!(clock.sleeps().is_empty());
    }
}
