//! Event types for docdaemon activity streaming

use serde::{Deserialize, Serialize};

use crate::domain::TaskRecord;

/// Aggregate queue/execution snapshot carried by heartbeat events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Whether the scheduler loop is active
    pub running: bool,

    /// Tasks currently executing (reconciled, see the status publisher)
    pub running_count: usize,

    /// Configured concurrency ceiling
    pub max_concurrent: usize,

    /// Tasks waiting in the unbounded backlog
    pub backlog_size: usize,

    /// Tasks in the bounded admission queue
    pub queue_size: usize,

    /// Spare admission-queue capacity
    pub queue_remaining_capacity: usize,

    /// Configured dispatch rate
    pub requests_per_second: f64,
}

/// The vocabulary of docdaemon activity
///
/// Task events carry the full record snapshot at the time of the
/// transition; queue events reflect scheduler lifecycle and health.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DocEvent {
    // === Task lifecycle ===
    /// A task entered the backlog
    TaskEnqueued { task: TaskRecord },
    /// An executor picked the task up
    TaskStarted { task: TaskRecord },
    /// Status or progress changed
    TaskUpdated { task: TaskRecord },
    /// The task reached a terminal state
    TaskFinished { task: TaskRecord },

    // === Queue lifecycle ===
    /// The scheduler loop was activated
    QueueStarted,
    /// The scheduler loop was deactivated
    QueueStopped,
    /// Periodic throttled snapshot of queue health
    QueueHeartbeat { status: QueueStatus },
}

impl DocEvent {
    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TaskEnqueued { .. } => "TaskEnqueued",
            Self::TaskStarted { .. } => "TaskStarted",
            Self::TaskUpdated { .. } => "TaskUpdated",
            Self::TaskFinished { .. } => "TaskFinished",
            Self::QueueStarted => "QueueStarted",
            Self::QueueStopped => "QueueStopped",
            Self::QueueHeartbeat { .. } => "QueueHeartbeat",
        }
    }

    /// Task id for task events, None for queue events
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskEnqueued { task }
            | Self::TaskStarted { task }
            | Self::TaskUpdated { task }
            | Self::TaskFinished { task } => Some(&task.id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryPoint, TaskRecord};

    fn task() -> TaskRecord {
        TaskRecord::with_id(
            "t-1",
            EntryPoint {
                class_fqn: "com.example.Svc".to_string(),
                method: "get()".to_string(),
                file: "/src/Svc.java".to_string(),
                line: 1,
                annotation: "@RpcService".to_string(),
            },
        )
    }

    #[test]
    fn test_event_type_and_task_id() {
        let e = DocEvent::TaskEnqueued { task: task() };
        assert_eq!(e.event_type(), "TaskEnqueued");
        assert_eq!(e.task_id(), Some("t-1"));

        let e = DocEvent::QueueStarted;
        assert_eq!(e.event_type(), "QueueStarted");
        assert_eq!(e.task_id(), None);
    }

    #[test]
    fn test_heartbeat_serde() {
        let e = DocEvent::QueueHeartbeat {
            status: QueueStatus {
                running: true,
                running_count: 2,
                max_concurrent: 4,
                backlog_size: 10,
                queue_size: 3,
                queue_remaining_capacity: 29,
                requests_per_second: 1.5,
            },
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"type\":\"QueueHeartbeat\""));

        let back: DocEvent = serde_json::from_str(&json).unwrap();
        match back {
            DocEvent::QueueHeartbeat { status } => {
                assert_eq!(status.running_count, 2);
                assert_eq!(status.queue_remaining_capacity, 29);
            }
            other => panic!("Expected QueueHeartbeat, got {}", other.event_type()),
        }
    }
}
