//! Task record domain type
//!
//! Tracks one entry point through the generation pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Current time as Unix milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// A discovered code entry point, the immutable work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Fully-qualified class name
    pub class_fqn: String,

    /// Method name including its parameter signature, e.g. `findUser(java.lang.String)`
    pub method: String,

    /// Absolute path of the declaring source file
    pub file: String,

    /// 1-indexed line of the method declaration
    pub line: u32,

    /// Annotation that marked this method as an entry point
    pub annotation: String,
}

impl EntryPoint {
    /// Method name without the parameter signature
    pub fn method_base(&self) -> &str {
        self.method.split('(').next().unwrap_or(&self.method)
    }

    /// Package part of the class FQN, if any
    pub fn package(&self) -> Option<&str> {
        self.class_fqn.rsplit_once('.').map(|(pkg, _)| pkg)
    }

    /// Fresh unique task id for this entry point
    pub fn fresh_task_id(&self) -> String {
        format!("{}#{}#{}", self.class_fqn, self.method, Uuid::now_v7())
    }
}

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the backlog or admission queue
    #[default]
    Queued,
    /// An executor is working on it
    Running,
    /// Failed with a retry scheduled; transient, never a final answer
    Partial,
    /// All artifacts written
    Succeeded,
    /// Terminal failure (retries exhausted or disabled)
    Failed,
    /// Cancelled by request, never retried
    Cancelled,
}

impl TaskStatus {
    /// Terminal states never transition again
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Partial => write!(f, "partial"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Whether the context bundle covers the entry method or its whole class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskScope {
    #[default]
    Method,
    Class,
}

/// Execution progress within one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskProgress {
    /// Fraction in [0, 1], non-decreasing within an attempt
    pub fraction: f64,

    /// Short phase label, e.g. "Analyzing"
    pub message: Option<String>,
}

impl TaskProgress {
    pub fn new(fraction: f64, message: impl Into<String>) -> Self {
        Self {
            fraction,
            message: Some(message.into()),
        }
    }
}

/// Locations of produced artifacts, set on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskResult {
    pub json_path: Option<String>,
    pub md_path: Option<String>,
    pub ctx_path: Option<String>,
}

/// Error kind + human message, set on failure or cancellation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: String,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Error recorded on a cancelled task
    pub fn cancelled() -> Self {
        Self::new("CANCELLED", "Cancelled")
    }
}

/// The central entity: one unit of work and its lifecycle state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique key, stable for the task's lifetime
    pub id: String,

    /// What to analyze and document
    pub entry: EntryPoint,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// Progress within the current attempt
    pub progress: TaskProgress,

    /// Context scope for generation
    #[serde(default)]
    pub scope: TaskScope,

    /// Analysis summary captured after the analysis phase
    #[serde(default)]
    pub analysis_summary: Option<String>,

    /// Artifact locations, populated on success
    #[serde(default)]
    pub result: Option<TaskResult>,

    /// Populated on failure or cancellation
    #[serde(default)]
    pub error: Option<TaskError>,

    /// Retry counter, incremented on each retried failure
    #[serde(default)]
    pub attempt: u32,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl TaskRecord {
    /// Create a queued record with a fresh id
    pub fn new(entry: EntryPoint) -> Self {
        let id = entry.fresh_task_id();
        Self::with_id(id, entry)
    }

    /// Create a queued record with a caller-supplied id
    pub fn with_id(id: impl Into<String>, entry: EntryPoint) -> Self {
        let id = id.into();
        debug!(%id, "TaskRecord::with_id: created");
        let now = now_ms();
        Self {
            id,
            entry,
            created_at: now,
            status: TaskStatus::Queued,
            progress: TaskProgress::default(),
            scope: TaskScope::Method,
            analysis_summary: None,
            result: None,
            error: None,
            attempt: 0,
            updated_at: now,
        }
    }

    /// Builder method to set the scope
    pub fn with_scope(mut self, scope: TaskScope) -> Self {
        self.scope = scope;
        self
    }

    /// Update the status
    pub fn set_status(&mut self, status: TaskStatus) {
        debug!(%self.id, ?status, "TaskRecord::set_status: called");
        self.status = status;
        self.updated_at = now_ms();
    }

    /// Update the progress fraction and phase label
    pub fn set_progress(&mut self, fraction: f64, message: impl Into<String>) {
        self.progress = TaskProgress::new(fraction, message);
        self.updated_at = now_ms();
    }

    /// Record an error
    pub fn set_error(&mut self, error: TaskError) {
        debug!(%self.id, kind = %error.kind, "TaskRecord::set_error: called");
        self.error = Some(error);
        self.updated_at = now_ms();
    }

    /// Reset to queued with zero progress, used on resume and retry
    pub fn reset_to_queued(&mut self, message: impl Into<String>) {
        self.status = TaskStatus::Queued;
        self.progress = TaskProgress::new(0.0, message);
        self.updated_at = now_ms();
    }

    /// Whether this record is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether this record should be re-admitted by a resume
    pub fn is_resumable(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Queued | TaskStatus::Running | TaskStatus::Partial
        )
    }
}
