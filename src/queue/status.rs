//! Status publisher: throttled queue health snapshots
//!
//! State-changing paths always attempt a publish; the throttle silently
//! drops attempts inside the minimum interval so observers see at most a
//! few heartbeats per second no matter how busy the queue is.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::domain::TaskStatus;
use crate::events::{DocEvent, EventBus, QueueStatus};
use crate::history::TaskRepository;

use super::manager::QueueShared;

/// Minimum wall-clock interval between emitted heartbeats
pub const HEARTBEAT_MIN_INTERVAL: Duration = Duration::from_millis(250);

/// Rate gate for heartbeat emission
pub struct HeartbeatThrottle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl HeartbeatThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Returns true when a heartbeat may be emitted now, and records the
    /// emission time; false inside the throttle window
    pub fn try_fire(&self) -> bool {
        let mut last = self.last.lock().expect("throttle lock poisoned");
        let now = Instant::now();
        match *last {
            Some(t) if now.duration_since(t) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

/// Publishes queue lifecycle events and throttled heartbeats
pub struct StatusPublisher {
    shared: Arc<QueueShared>,
    repo: Arc<TaskRepository>,
    bus: Arc<EventBus>,
    throttle: HeartbeatThrottle,
}

impl StatusPublisher {
    pub(crate) fn new(shared: Arc<QueueShared>, repo: Arc<TaskRepository>, bus: Arc<EventBus>) -> Self {
        Self {
            shared,
            repo,
            bus,
            throttle: HeartbeatThrottle::new(HEARTBEAT_MIN_INTERVAL),
        }
    }

    /// Scheduler loop activated; never throttled
    pub fn started(&self) {
        self.bus.emit(DocEvent::QueueStarted);
    }

    /// Scheduler loop deactivated; never throttled
    pub fn stopped(&self) {
        self.bus.emit(DocEvent::QueueStopped);
    }

    /// Assemble the current snapshot
    ///
    /// The running count is reconciled as the maximum of the executing-map
    /// size and the number of records the repository holds in Running;
    /// the two are updated on different paths and can skew transiently.
    pub fn snapshot(&self) -> QueueStatus {
        let config = self.shared.config();
        let executing = self.shared.executing_len();
        let repo_running = self.repo.count_status(TaskStatus::Running);
        let queue_size = self.shared.admitted_len();

        QueueStatus {
            running: self.shared.is_running(),
            running_count: executing.max(repo_running),
            max_concurrent: config.max_concurrent_requests,
            backlog_size: self.shared.backlog_len(),
            queue_size,
            queue_remaining_capacity: config.queue_size.saturating_sub(queue_size),
            requests_per_second: config.requests_per_second,
        }
    }

    /// Attempt a heartbeat publish; returns whether one was emitted
    pub fn heartbeat(&self) -> bool {
        if !self.throttle.try_fire() {
            return false;
        }
        let status = self.snapshot();
        debug!(
            running_count = status.running_count,
            backlog = status.backlog_size,
            queued = status.queue_size,
            "StatusPublisher::heartbeat"
        );
        self.bus.emit(DocEvent::QueueHeartbeat { status });
        true
    }
}
