//! Retry controller: decides what happens to a failed task

use std::time::Duration;

use tracing::debug;

use super::config::RetryConfig;

/// Outcome of the retry decision for one failed execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-enqueue to the backlog after the backoff delay; the record's
    /// attempt counter must be incremented before re-admission
    Retry { backoff: Duration },

    /// Terminal: retries disabled or attempts exhausted
    Fail,
}

/// Fixed-backoff retry policy
///
/// Backoff is deliberately a constant per attempt, not exponential: callers
/// wanting longer delays change `backoff-ms`, not the algorithm.
pub fn decide(attempt: u32, config: &RetryConfig) -> RetryDecision {
    if config.enabled && attempt + 1 < config.max_attempts {
        debug!(attempt, max_attempts = config.max_attempts, "retry::decide: retrying");
        RetryDecision::Retry {
            backoff: config.backoff(),
        }
    } else {
        debug!(attempt, enabled = config.enabled, "retry::decide: failing");
        RetryDecision::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enabled: bool, max_attempts: u32) -> RetryConfig {
        RetryConfig {
            enabled,
            max_attempts,
            backoff_ms: 100,
        }
    }

    #[test]
    fn test_retry_until_attempts_exhausted() {
        let cfg = config(true, 3);
        assert_eq!(
            decide(0, &cfg),
            RetryDecision::Retry {
                backoff: Duration::from_millis(100)
            }
        );
        assert_eq!(
            decide(1, &cfg),
            RetryDecision::Retry {
                backoff: Duration::from_millis(100)
            }
        );
        // Third execution (attempt counter 2) is the last
        assert_eq!(decide(2, &cfg), RetryDecision::Fail);
    }

    #[test]
    fn test_disabled_always_fails() {
        let cfg = config(false, 3);
        assert_eq!(decide(0, &cfg), RetryDecision::Fail);
    }

    #[test]
    fn test_single_attempt_never_retries() {
        let cfg = config(true, 1);
        assert_eq!(decide(0, &cfg), RetryDecision::Fail);
    }
}
