//! Task scheduling and concurrency-control core
//!
//! The queue admits an unbounded stream of submitted tasks into execution
//! under a configurable rate and concurrency ceiling, tracks per-task
//! lifecycle and retries, supports cancellation and publishes throttled
//! aggregate status.

mod config;
mod executor;
mod limiter;
mod manager;
mod retry;
mod status;

pub use config::{QueueConfig, RetryConfig};
pub use executor::{ExecOutcome, Pipeline, TaskExecutor};
pub use limiter::ConcurrencyLimiter;
pub use manager::QueueManager;
pub use retry::RetryDecision;
pub use status::{HEARTBEAT_MIN_INTERVAL, HeartbeatThrottle, StatusPublisher};
