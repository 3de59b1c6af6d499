//! Queue configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler/queue configuration
///
/// All fields can be changed at runtime via
/// [`QueueManager::update_config`](super::QueueManager::update_config);
/// the scheduler picks changes up on its next tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum simultaneously executing tasks
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: usize,

    /// Dispatch pacing: one scheduler tick per `1/requests_per_second` seconds
    #[serde(rename = "requests-per-second")]
    pub requests_per_second: f64,

    /// Capacity of the bounded admission queue
    #[serde(rename = "queue-size")]
    pub queue_size: usize,

    /// Retry policy for failed tasks
    pub retry: RetryConfig,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 2,
            requests_per_second: 1.5,
            queue_size: 32,
            retry: RetryConfig::default(),
        }
    }
}

impl QueueConfig {
    /// Scheduler tick period: `max(1ms, 1000ms / requests_per_second)`
    pub fn tick_period(&self) -> Duration {
        if self.requests_per_second <= 0.0 {
            return Duration::from_millis(1000);
        }
        let period_ms = (1000.0 / self.requests_per_second).max(1.0);
        Duration::from_millis(period_ms as u64)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Whether failed tasks are retried at all
    pub enabled: bool,

    /// Total execution attempts before a task is failed for good
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Fixed delay before a retried task re-enters the backlog
    #[serde(rename = "backoff-ms")]
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            backoff_ms: 1500,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}
