//! TaskRepository: insertion-ordered task history with event publication
//!
//! Every status mutation in the pipeline goes through this repository: it
//! stores the latest record snapshot, persists the bounded history to a
//! JSONL file (one record per line, rewritten on change) and publishes the
//! matching task lifecycle event on the bus.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::domain::{TaskRecord, TaskStatus};
use crate::events::{DocEvent, EventBus};

struct RepoInner {
    /// Task ids in insertion order, oldest first
    order: Vec<String>,
    tasks: HashMap<String, TaskRecord>,
}

/// Task history store
pub struct TaskRepository {
    inner: Mutex<RepoInner>,
    bus: Arc<EventBus>,
    history_file: Option<PathBuf>,
    history_limit: usize,
}

impl TaskRepository {
    /// In-memory repository (no persistence)
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            inner: Mutex::new(RepoInner {
                order: Vec::new(),
                tasks: HashMap::new(),
            }),
            bus,
            history_file: None,
            history_limit: usize::MAX,
        }
    }

    /// Repository persisting up to `history_limit` records at `path`,
    /// preloaded from an existing file if one is present
    pub fn with_persistence(
        bus: Arc<EventBus>,
        path: impl AsRef<Path>,
        history_limit: usize,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        debug!(path = %path.display(), history_limit, "TaskRepository::with_persistence: called");

        let mut inner = RepoInner {
            order: Vec::new(),
            tasks: HashMap::new(),
        };
        match load_history(&path) {
            Ok(records) => {
                for record in records {
                    inner.order.push(record.id.clone());
                    inner.tasks.insert(record.id.clone(), record);
                }
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to load task history"),
        }

        Self {
            inner: Mutex::new(inner),
            bus,
            history_file: Some(path),
            history_limit: history_limit.max(1),
        }
    }

    /// All records in insertion order
    pub fn all(&self) -> Vec<TaskRecord> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        inner
            .order
            .iter()
            .filter_map(|id| inner.tasks.get(id))
            .cloned()
            .collect()
    }

    /// Latest snapshot of one record
    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        let inner = self.inner.lock().expect("repository lock poisoned");
        inner.tasks.get(id).cloned()
    }

    /// Number of records currently in the given status
    pub fn count_status(&self, status: TaskStatus) -> usize {
        let inner = self.inner.lock().expect("repository lock poisoned");
        inner.tasks.values().filter(|t| t.status == status).count()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.inner.lock().expect("repository lock poisoned").tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a newly submitted task
    pub fn enqueued(&self, task: &TaskRecord) {
        self.store(task);
        self.bus.emit(DocEvent::TaskEnqueued { task: task.clone() });
    }

    /// Record the queued→running transition
    pub fn started(&self, task: &TaskRecord) {
        self.store(task);
        self.bus.emit(DocEvent::TaskStarted { task: task.clone() });
    }

    /// Record a progress or status update
    pub fn updated(&self, task: &TaskRecord) {
        self.store(task);
        self.bus.emit(DocEvent::TaskUpdated { task: task.clone() });
    }

    /// Record a terminal transition
    pub fn finished(&self, task: &TaskRecord) {
        debug!(id = %task.id, status = %task.status, "TaskRepository::finished: called");
        self.store(task);
        self.bus.emit(DocEvent::TaskFinished { task: task.clone() });
    }

    /// Drop all history, in memory and on disk
    pub fn clear_all(&self) {
        {
            let mut inner = self.inner.lock().expect("repository lock poisoned");
            inner.order.clear();
            inner.tasks.clear();
            self.persist(&inner);
        }
    }

    fn store(&self, task: &TaskRecord) {
        let mut inner = self.inner.lock().expect("repository lock poisoned");
        if !inner.tasks.contains_key(&task.id) {
            inner.order.push(task.id.clone());
        }
        inner.tasks.insert(task.id.clone(), task.clone());

        // Bounded history: drop oldest records beyond the limit
        while inner.order.len() > self.history_limit {
            let oldest = inner.order.remove(0);
            inner.tasks.remove(&oldest);
        }

        self.persist(&inner);
    }

    fn persist(&self, inner: &RepoInner) {
        let Some(path) = &self.history_file else {
            return;
        };
        let mut lines = String::new();
        for id in &inner.order {
            if let Some(record) = inner.tasks.get(id) {
                match serde_json::to_string(record) {
                    Ok(line) => {
                        lines.push_str(&line);
                        lines.push('\n');
                    }
                    Err(e) => warn!(%id, error = %e, "Failed to serialize task record"),
                }
            }
        }
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %path.display(), error = %e, "Failed to create history directory");
                return;
            }
        }
        if let Err(e) = fs::write(path, lines) {
            warn!(path = %path.display(), error = %e, "Failed to write task history");
        }
    }
}

fn load_history(path: &Path) -> eyre::Result<Vec<TaskRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    let mut records = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        records.push(serde_json::from_str::<TaskRecord>(line)?);
    }
    Ok(records)
}
