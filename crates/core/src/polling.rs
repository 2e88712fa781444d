//! Wait policy for long-running remote jobs.
//!
//! The delay between status queries starts at [`PollPolicy::interval`]
//! and grows by [`PollPolicy::multiplier`] after every pending status,
//! clamped to [`PollPolicy::max_interval`]. A multiplier of `1.0` gives
//! fixed-interval polling. Both an overall deadline and an attempt cap
//! are optional; with neither set the poller waits indefinitely.

use std::time::Duration;

use crate::error::CoreError;

/// Fixed delay between status queries unless the caller says otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Tunable wait strategy carried by every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second status query. Zero re-polls back to back.
    pub interval: Duration,
    /// Upper bound on the delay between queries.
    pub max_interval: Duration,
    /// Factor by which the delay grows after each pending status.
    pub multiplier: f64,
    /// Give up once waiting would run past this much time since submission.
    pub deadline: Option<Duration>,
    /// Give up after this many status queries still reported pending.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL)
    }
}

impl PollPolicy {
    /// Fixed-interval polling with no bound.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            multiplier: 1.0,
            deadline: None,
            max_attempts: None,
        }
    }

    /// Capped exponential backoff with no bound.
    pub fn exponential(initial: Duration, max_interval: Duration, multiplier: f64) -> Self {
        Self {
            interval: initial,
            max_interval,
            multiplier,
            deadline: None,
            max_attempts: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Same bounds, but a fixed `interval` between queries.
    pub fn with_fixed_interval(self, interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            multiplier: 1.0,
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_interval < self.interval {
            return Err(CoreError::Validation(format!(
                "max poll interval ({:?}) is shorter than the initial interval ({:?})",
                self.max_interval, self.interval
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CoreError::Validation(format!(
                "poll multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_attempts == Some(0) {
            return Err(CoreError::Validation(
                "max poll attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Calculate the next delay from the current delay and policy.
///
/// The result is clamped to [`PollPolicy::max_interval`].
pub fn next_delay(current: Duration, policy: &PollPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_interval)
}

/// What to do after a status query reported the job still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Sleep for the given delay, then query again.
    Wait(Duration),
    /// The overall deadline would be crossed by the next sleep.
    DeadlineExceeded,
    /// The attempt cap has been reached.
    AttemptsExhausted,
}

/// Decide whether to keep waiting.
///
/// * `attempts` - status queries made so far (all pending).
/// * `elapsed`  - time since submission.
/// * `delay`    - the delay that would be slept next.
pub fn decide(
    attempts: u32,
    elapsed: Duration,
    delay: Duration,
    policy: &PollPolicy,
) -> PollDecision {
    if let Some(max) = policy.max_attempts {
        if attempts >= max {
            return PollDecision::AttemptsExhausted;
        }
    }
    if let Some(deadline) = policy.deadline {
        if elapsed + delay > deadline {
            return PollDecision::DeadlineExceeded;
        }
    }
    PollDecision::Wait(delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_ten_seconds_unbounded() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(10));
        assert_eq!(next_delay(policy.interval, &policy), Duration::from_secs(10));
        assert!(policy.deadline.is_none());
        assert!(policy.max_attempts.is_none());
    }

    #[test]
    fn exponential_sequence_clamps() {
        let policy =
            PollPolicy::exponential(Duration::from_secs(1), Duration::from_secs(30), 2.0);
        let mut delay = policy.interval;
        let expected = [1, 2, 4, 8, 16, 30, 30];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &policy);
        }
    }

    #[test]
    fn fixed_interval_override_keeps_bounds() {
        let policy = PollPolicy::exponential(Duration::from_secs(1), Duration::from_secs(8), 2.0)
            .with_deadline(Duration::from_secs(60))
            .with_max_attempts(5)
            .with_fixed_interval(Duration::from_millis(10));

        assert_eq!(policy.interval, Duration::from_millis(10));
        assert_eq!(policy.max_interval, Duration::from_millis(10));
        assert_eq!(policy.multiplier, 1.0);
        assert_eq!(policy.deadline, Some(Duration::from_secs(60)));
        assert_eq!(policy.max_attempts, Some(5));
    }

    #[test]
    fn zero_interval_polls_back_to_back() {
        let policy = PollPolicy::fixed(Duration::ZERO);
        assert!(policy.validate().is_ok());
        assert_eq!(next_delay(policy.interval, &policy), Duration::ZERO);
    }

    #[test]
    fn shrinking_multiplier_rejected() {
        let policy = PollPolicy::exponential(Duration::from_secs(1), Duration::from_secs(4), 0.5);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn max_below_initial_rejected() {
        let policy = PollPolicy::exponential(Duration::from_secs(4), Duration::from_secs(1), 2.0);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn zero_attempts_rejected() {
        assert!(PollPolicy::default().with_max_attempts(0).validate().is_err());
    }

    #[test]
    fn unbounded_policy_always_waits() {
        let policy = PollPolicy::fixed(Duration::from_secs(10));
        assert_eq!(
            decide(10_000, Duration::from_secs(86_400), Duration::from_secs(10), &policy),
            PollDecision::Wait(Duration::from_secs(10))
        );
    }

    #[test]
    fn attempt_cap_reached() {
        let policy = PollPolicy::fixed(Duration::from_secs(1)).with_max_attempts(3);
        assert_eq!(
            decide(2, Duration::ZERO, Duration::from_secs(1), &policy),
            PollDecision::Wait(Duration::from_secs(1))
        );
        assert_eq!(
            decide(3, Duration::ZERO, Duration::from_secs(1), &policy),
            PollDecision::AttemptsExhausted
        );
    }

    #[test]
    fn deadline_checked_against_next_sleep() {
        let policy = PollPolicy::fixed(Duration::from_secs(10)).with_deadline(Duration::from_secs(30));
        // 20s elapsed + 10s sleep lands exactly on the deadline: allowed.
        assert_eq!(
            decide(2, Duration::from_secs(20), Duration::from_secs(10), &policy),
            PollDecision::Wait(Duration::from_secs(10))
        );
        assert_eq!(
            decide(3, Duration::from_secs(21), Duration::from_secs(10), &policy),
            PollDecision::DeadlineExceeded
        );
    }
}
