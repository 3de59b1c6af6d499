//! Queue manager: submission, admission, dispatch and lifecycle control
//!
//! One `QueueManager` owns the whole scheduling core for a project: the
//! unbounded backlog, the bounded admission queue, the concurrency limiter
//! and the periodic driver that moves tasks between them. Executors run on
//! spawned tasks; the driver itself never blocks on their work.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::create_analyzer;
use crate::config::Config;
use crate::context::ContextPackager;
use crate::domain::{EntryPoint, TaskError, TaskRecord, TaskStatus};
use crate::events::{DocEvent, EventBus, QueueStatus};
use crate::history::TaskRepository;
use crate::llm::create_client;
use crate::output::OutputWriter;

use super::config::QueueConfig;
use super::executor::{ExecOutcome, Pipeline, TaskExecutor};
use super::limiter::ConcurrencyLimiter;
use super::retry::{self, RetryDecision};
use super::status::StatusPublisher;

/// State shared between the manager handle, the driver task and the
/// status publisher
pub(crate) struct QueueShared {
    /// Unbounded FIFO of submitted-but-not-admitted tasks
    backlog: Mutex<VecDeque<TaskRecord>>,

    /// Bounded FIFO of tasks ready for imminent dispatch; capacity is
    /// enforced against the configured queue size each tick
    admitted: Mutex<VecDeque<TaskRecord>>,

    /// Cancellation tokens of currently executing tasks, by task id
    executing: Mutex<HashMap<String, CancellationToken>>,

    /// Hard permit accounting, in addition to executing-map gating
    pub(crate) limiter: ConcurrencyLimiter,

    /// Whether the scheduler loop is active
    running: AtomicBool,

    config: Mutex<QueueConfig>,
}

impl QueueShared {
    pub(crate) fn new(config: QueueConfig) -> Self {
        let ceiling = config.max_concurrent_requests;
        Self {
            backlog: Mutex::new(VecDeque::new()),
            admitted: Mutex::new(VecDeque::new()),
            executing: Mutex::new(HashMap::new()),
            limiter: ConcurrencyLimiter::new(ceiling),
            running: AtomicBool::new(false),
            config: Mutex::new(config),
        }
    }

    pub(crate) fn config(&self) -> QueueConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    pub(crate) fn backlog_len(&self) -> usize {
        self.backlog.lock().expect("backlog lock poisoned").len()
    }

    pub(crate) fn admitted_len(&self) -> usize {
        self.admitted.lock().expect("admitted lock poisoned").len()
    }

    pub(crate) fn executing_len(&self) -> usize {
        self.executing.lock().expect("executing lock poisoned").len()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

struct ManagerInner {
    shared: Arc<QueueShared>,
    repo: Arc<TaskRepository>,
    bus: Arc<EventBus>,
    publisher: Arc<StatusPublisher>,
    executor: Arc<TaskExecutor>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the scheduling core; cheap to clone
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<ManagerInner>,
}

impl QueueManager {
    /// Create a manager over explicit collaborators
    pub fn new(
        config: QueueConfig,
        repo: Arc<TaskRepository>,
        bus: Arc<EventBus>,
        pipeline: Pipeline,
    ) -> Self {
        let shared = Arc::new(QueueShared::new(config));
        let publisher = Arc::new(StatusPublisher::new(shared.clone(), repo.clone(), bus.clone()));
        let executor = Arc::new(TaskExecutor::new(pipeline, repo.clone(), publisher.clone()));
        Self {
            inner: Arc::new(ManagerInner {
                shared,
                repo,
                bus,
                publisher,
                executor,
                driver: Mutex::new(None),
            }),
        }
    }

    /// Create a manager with collaborators built from configuration
    pub fn from_config(
        config: &Config,
        repo: Arc<TaskRepository>,
        bus: Arc<EventBus>,
    ) -> eyre::Result<Self> {
        let analyzer = create_analyzer(&config.analysis)?;
        let client = create_client(&config.llm, &config.prompt, config.crud.clone())?;
        let base = config
            .output
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let writer = OutputWriter::new(base);
        let packager = ContextPackager::new(writer.clone(), &config.context);
        let pipeline = Pipeline {
            analyzer,
            client,
            packager,
            writer,
            group_docs_by_package: config.output.group_docs_by_package,
        };
        Ok(Self::new(config.queue.clone(), repo, bus, pipeline))
    }

    /// The task history this manager records into
    pub fn repository(&self) -> Arc<TaskRepository> {
        self.inner.repo.clone()
    }

    /// Subscribe to task and queue events
    pub fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
        self.inner.bus.subscribe()
    }

    // === Submission ===

    /// Submit entry points as new tasks; never blocks. Returns the
    /// assigned task ids in submission order.
    pub fn submit(&self, entries: Vec<EntryPoint>) -> Vec<String> {
        let tasks: Vec<TaskRecord> = entries.into_iter().map(TaskRecord::new).collect();
        let ids = tasks.iter().map(|t| t.id.clone()).collect();
        self.submit_tasks(tasks);
        ids
    }

    /// Submit pre-built task records; a record with an empty id gets a
    /// fresh one assigned
    pub fn submit_tasks(&self, tasks: Vec<TaskRecord>) {
        debug!(count = tasks.len(), "QueueManager::submit_tasks: called");
        for mut task in tasks {
            if task.id.is_empty() {
                task.id = task.entry.fresh_task_id();
            }
            self.inner.repo.enqueued(&task);
            self.inner
                .shared
                .backlog
                .lock()
                .expect("backlog lock poisoned")
                .push_back(task);
        }
        self.inner.publisher.heartbeat();
    }

    // === Lifecycle ===

    /// Start the scheduler loop; a no-op if already running. Resets the
    /// concurrency limiter to the currently configured ceiling.
    pub fn start(&self) {
        if self
            .inner
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("QueueManager::start: already running");
            return;
        }

        let config = self.inner.shared.config();
        self.inner.shared.limiter.reset(config.max_concurrent_requests);

        let mgr = self.clone();
        let handle = tokio::spawn(async move { mgr.run_driver().await });
        *self.inner.driver.lock().expect("driver lock poisoned") = Some(handle);

        info!(
            rps = config.requests_per_second,
            period_ms = config.tick_period().as_millis() as u64,
            max_concurrent = config.max_concurrent_requests,
            "Queue started"
        );
        self.inner.publisher.started();
        self.inner.publisher.heartbeat();
    }

    /// Stop the scheduler loop, leaving all queued and running state
    /// untouched; safe to call repeatedly
    pub fn stop(&self) {
        self.inner.shared.running.store(false, Ordering::Release);
        if let Some(handle) = self.inner.driver.lock().expect("driver lock poisoned").take() {
            handle.abort();
        }
        info!("Queue stopped");
        self.inner.publisher.stopped();
    }

    /// Drop all backlog and admission-queue contents and reset the
    /// running counter. Intended for full resets; tasks already
    /// executing are not touched and will release safely when they end.
    pub fn clear(&self) {
        self.inner
            .shared
            .backlog
            .lock()
            .expect("backlog lock poisoned")
            .clear();
        self.inner
            .shared
            .admitted
            .lock()
            .expect("admitted lock poisoned")
            .clear();
        self.inner.shared.limiter.reset_running();
        info!("Queue cleared");
    }

    /// Replace the queue configuration; the scheduler picks the change up
    /// on its next tick
    pub fn update_config(&self, config: QueueConfig) {
        debug!(?config, "QueueManager::update_config: called");
        *self.inner.shared.config.lock().expect("config lock poisoned") = config;
    }

    // === Cancellation ===

    /// Request cancellation of a running task. Advisory: the executor
    /// honors it at its next phase boundary
    pub fn cancel(&self, id: &str) {
        debug!(%id, "QueueManager::cancel: called");
        let token = self
            .inner
            .shared
            .executing
            .lock()
            .expect("executing lock poisoned")
            .get(id)
            .cloned();
        if let Some(token) = token {
            token.cancel();
        }
    }

    /// Request cancellation of every running task; no atomicity across
    /// tasks
    pub fn cancel_all(&self) {
        let tokens: Vec<CancellationToken> = {
            let executing = self
                .inner
                .shared
                .executing
                .lock()
                .expect("executing lock poisoned");
            executing.values().cloned().collect()
        };
        debug!(count = tokens.len(), "QueueManager::cancel_all: called");
        for token in tokens {
            token.cancel();
        }
    }

    // === Resume ===

    /// Re-admit tasks found queued, running or partial in an external
    /// history store: each is reset to queued with zero progress and
    /// pushed onto the backlog. Terminal tasks are ignored.
    /// Returns how many tasks were re-admitted.
    pub fn resume_pending(&self, tasks: Vec<TaskRecord>) -> usize {
        let mut resumed = 0;
        for mut task in tasks {
            if !task.is_resumable() {
                continue;
            }
            task.reset_to_queued("Auto-resume");
            self.inner.repo.updated(&task);
            self.inner
                .shared
                .backlog
                .lock()
                .expect("backlog lock poisoned")
                .push_back(task);
            resumed += 1;
        }
        if resumed > 0 {
            info!(resumed, "Re-admitted pending tasks");
        }
        resumed
    }

    /// Resume every pending task recorded in this manager's own history,
    /// starting the scheduler if it is stopped
    pub fn auto_resume(&self) -> usize {
        let resumed = self.resume_pending(self.inner.repo.all());
        if resumed > 0 {
            if !self.inner.shared.is_running() {
                self.start();
            } else {
                self.inner.publisher.heartbeat();
            }
        }
        resumed
    }

    // === Observation ===

    /// On-demand queue health snapshot (not throttled)
    pub fn queue_status(&self) -> QueueStatus {
        self.inner.publisher.snapshot()
    }

    /// True when nothing is queued, admitted or executing
    pub fn is_idle(&self) -> bool {
        self.inner.shared.backlog_len() == 0
            && self.inner.shared.admitted_len() == 0
            && self.inner.shared.executing_len() == 0
    }

    // === Driver ===

    async fn run_driver(self) {
        debug!("QueueManager::run_driver: driver started");
        loop {
            if !self.inner.shared.is_running() {
                break;
            }
            if let Err(e) = self.tick() {
                // A bad tick must not wedge the scheduler
                warn!(error = %e, "Scheduler tick failed; continuing");
            }
            tokio::time::sleep(self.inner.shared.config().tick_period()).await;
        }
        debug!("QueueManager::run_driver: driver exited");
    }

    /// One scheduler tick: refresh the limiter, drain backlog into the
    /// admission queue, dispatch up to the available slots, heartbeat
    fn tick(&self) -> eyre::Result<()> {
        let shared = &self.inner.shared;
        if !shared.is_running() {
            return Ok(());
        }
        let config = shared.config();

        // 1. Apply any concurrency ceiling change
        shared.limiter.resize(config.max_concurrent_requests);

        // 2. Fill the bounded admission queue from the backlog
        {
            let mut backlog = shared.backlog.lock().expect("backlog lock poisoned");
            let mut admitted = shared.admitted.lock().expect("admitted lock poisoned");
            while admitted.len() < config.queue_size {
                match backlog.pop_front() {
                    Some(task) => admitted.push_back(task),
                    None => break,
                }
            }
        }

        // 3. Slots derived from the executing map, independent of the
        // permit pool, so transient skew in either cannot oversubscribe
        let available = config
            .max_concurrent_requests
            .saturating_sub(shared.executing_len());
        if available == 0 {
            self.inner.publisher.heartbeat();
            return Ok(());
        }

        // 4. Dispatch in FIFO order while permits hold out
        let mut dispatched = 0;
        while dispatched < available {
            let task = shared
                .admitted
                .lock()
                .expect("admitted lock poisoned")
                .pop_front();
            let Some(task) = task else { break };

            if !shared.limiter.try_acquire() {
                // No permit: put the task back at the head and wait for
                // the next tick instead of spinning
                shared
                    .admitted
                    .lock()
                    .expect("admitted lock poisoned")
                    .push_front(task);
                break;
            }
            self.dispatch(task);
            dispatched += 1;
        }

        // 5. Throttled heartbeat
        self.inner.publisher.heartbeat();
        Ok(())
    }

    /// Hand one task to an executor on its own tokio task
    fn dispatch(&self, mut task: TaskRecord) {
        let token = CancellationToken::new();
        let id = task.id.clone();
        self.inner
            .shared
            .executing
            .lock()
            .expect("executing lock poisoned")
            .insert(id.clone(), token.clone());
        debug!(%id, "QueueManager::dispatch: handing task to executor");

        let mgr = self.clone();
        tokio::spawn(async move {
            let outcome = mgr.inner.executor.execute(&mut task, &token).await;
            if let ExecOutcome::Failed { error } = outcome {
                mgr.handle_failure(task, error);
            }
            // Exactly one release per acquire, regardless of outcome
            mgr.inner
                .shared
                .executing
                .lock()
                .expect("executing lock poisoned")
                .remove(&id);
            mgr.inner.shared.limiter.release();
            mgr.inner.publisher.heartbeat();
        });
    }

    /// Retry controller: route a failed execution to a delayed retry or a
    /// terminal failure
    fn handle_failure(&self, mut task: TaskRecord, error: TaskError) {
        let config = self.inner.shared.config();
        match retry::decide(task.attempt, &config.retry) {
            RetryDecision::Retry { backoff } => {
                task.attempt += 1;
                task.set_status(TaskStatus::Partial);
                task.set_error(error);
                self.inner.repo.updated(&task);
                info!(id = %task.id, attempt = task.attempt, backoff_ms = backoff.as_millis() as u64, "Task failed; retry scheduled");

                let mgr = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(backoff).await;
                    task.reset_to_queued("Retry");
                    mgr.inner.repo.updated(&task);
                    // Back of the backlog, not the admission queue, so
                    // retries stay fair against fresh submissions
                    mgr.inner
                        .shared
                        .backlog
                        .lock()
                        .expect("backlog lock poisoned")
                        .push_back(task);
                });
            }
            RetryDecision::Fail => {
                warn!(id = %task.id, attempt = task.attempt, kind = %error.kind, "Task failed permanently");
                task.set_status(TaskStatus::Failed);
                task.set_error(error);
                self.inner.repo.finished(&task);
            }
        }
    }
}
