//! Retry decisions for a single page fetch.
//!
//! [`RetryPolicy::decide`] is pure: it maps an outcome and the 1-based
//! attempt number to a decision. Sleeping is left to the caller.

use crate::error::HarvestError;
use crate::outcome::FetchOutcome;
use raspe_core::HarvestConfig;
use std::time::Duration;

/// Default attempt budget per page.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff base (first retry waits this long).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// What to do after an attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Hand the outcome back to the caller (success or non-retryable client error)
    Return(FetchOutcome),
    /// Wait, then re-issue the same request
    RetryAfter(Duration),
    /// Give up on this request
    Fail(HarvestError),
}

/// Bounded retry with exponential backoff for 429 and 5xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// Create a policy. A budget of zero is treated as one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy from the `[harvest]` configuration section.
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_secs(config.backoff_base_secs),
        )
    }

    /// Attempt budget.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1_u32 << exponent)
    }

    /// Decide what follows attempt `attempt` (1-based) given its outcome.
    #[must_use]
    pub fn decide(&self, outcome: FetchOutcome, attempt: u32) -> RetryDecision {
        let exhausted = attempt >= self.max_attempts;

        match outcome {
            FetchOutcome::Success { .. } | FetchOutcome::ClientError { .. } => {
                RetryDecision::Return(outcome)
            }
            FetchOutcome::RateLimited { retry_after } => {
                if exhausted {
                    RetryDecision::Fail(HarvestError::RateLimited { retry_after })
                } else {
                    let wait = retry_after
                        .map_or_else(|| self.backoff(attempt), Duration::from_secs);
                    RetryDecision::RetryAfter(wait)
                }
            }
            FetchOutcome::ServerError { status, body } => {
                if exhausted {
                    RetryDecision::Fail(HarvestError::server(status, &body))
                } else {
                    RetryDecision::RetryAfter(self.backoff(attempt))
                }
            }
            FetchOutcome::TransportFailure { cause } => {
                RetryDecision::Fail(HarvestError::Transport(cause))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait(decision: RetryDecision) -> Duration {
        match decision {
            RetryDecision::RetryAfter(d) => d,
            other => panic!("expected RetryAfter, got {other:?}"),
        }
    }

    #[test]
    fn test_success_and_client_error_return_immediately() {
        let policy = RetryPolicy::default();
        let ok = FetchOutcome::Success {
            payload: b"x".to_vec(),
            status: 200,
        };
        assert!(matches!(policy.decide(ok, 1), RetryDecision::Return(_)));

        let not_found = FetchOutcome::ClientError {
            status: 404,
            body: String::new(),
        };
        assert!(matches!(policy.decide(not_found, 1), RetryDecision::Return(_)));
    }

    #[test]
    fn test_retry_after_hint_wins() {
        let policy = RetryPolicy::default();
        let limited = || FetchOutcome::RateLimited {
            retry_after: Some(30),
        };
        assert_eq!(wait(policy.decide(limited(), 1)), Duration::from_secs(30));
        assert_eq!(wait(policy.decide(limited(), 2)), Duration::from_secs(30));
    }

    #[test]
    fn test_exponential_without_hint() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1));
        for attempt in 1..5 {
            let decision = policy.decide(FetchOutcome::RateLimited { retry_after: None }, attempt);
            assert_eq!(wait(decision), Duration::from_secs(1 << (attempt - 1)));
        }
    }

    #[test]
    fn test_server_error_backoff() {
        let policy = RetryPolicy::default();
        let outcome = || FetchOutcome::ServerError {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(wait(policy.decide(outcome(), 1)), Duration::from_secs(1));
        assert_eq!(wait(policy.decide(outcome(), 2)), Duration::from_secs(2));
    }

    #[test]
    fn test_exhaustion_is_terminal() {
        let policy = RetryPolicy::default();
        match policy.decide(FetchOutcome::RateLimited { retry_after: Some(7) }, 3) {
            RetryDecision::Fail(HarvestError::RateLimited { retry_after }) => {
                assert_eq!(retry_after, Some(7));
            }
            other => panic!("unexpected {other:?}"),
        }

        let outcome = FetchOutcome::ServerError {
            status: 500,
            body: "boom".into(),
        };
        match policy.decide(outcome, 3) {
            RetryDecision::Fail(HarvestError::Server { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_transport_failure_not_retried() {
        let policy = RetryPolicy::default();
        let outcome = FetchOutcome::TransportFailure {
            cause: "connection reset".into(),
        };
        assert!(matches!(
            policy.decide(outcome, 1),
            RetryDecision::Fail(HarvestError::Transport(_))
        ));
    }

    #[test]
    fn test_zero_budget_means_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
        assert!(matches!(
            policy.decide(FetchOutcome::RateLimited { retry_after: None }, 1),
            RetryDecision::Fail(_)
        ));
    }
}
