//! Integration tests for docdaemon
//!
//! These drive the public API end to end: submission through the queue
//! core, the stub pipeline, artifact writing, events and resume.

use std::io::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tempfile::TempDir;

use docdaemon::analysis::{AnalysisResult, StubAnalyzer};
use docdaemon::config::ContextConfig;
use docdaemon::domain::{CrudPatterns, EntryPoint, TaskRecord, TaskStatus};
use docdaemon::events::{DocEvent, create_event_bus};
use docdaemon::history::TaskRepository;
use docdaemon::llm::{DocClient, GeneratedDoc, LlmError, StubDocClient};
use docdaemon::output::OutputWriter;
use docdaemon::queue::{Pipeline, QueueConfig, QueueManager, RetryConfig};
use docdaemon::{ContextPackager, EventBus};

fn fast_config(max_concurrent: usize) -> QueueConfig {
    QueueConfig {
        max_concurrent_requests: max_concurrent,
        requests_per_second: 200.0,
        queue_size: 32,
        retry: RetryConfig {
            enabled: true,
            max_attempts: 3,
            backoff_ms: 20,
        },
    }
}

fn write_source(dir: &std::path::Path) -> String {
    let path = dir.join("UserService.java");
    let mut f = std::fs::File::create(&path).unwrap();
    for i in 1..=30 {
        writeln!(f, "// source line {i}").unwrap();
    }
    path.to_string_lossy().into_owned()
}

fn entry(file: &str, n: usize) -> EntryPoint {
    EntryPoint {
        class_fqn: "com.example.user.UserService".to_string(),
        method: format!("findUser{n}(java.lang.String)"),
        file: file.to_string(),
        line: 10,
        annotation: "@RpcService".to_string(),
    }
}

fn stub_manager(
    dir: &TempDir,
    config: QueueConfig,
    repo: Arc<TaskRepository>,
    bus: Arc<EventBus>,
) -> QueueManager {
    manager_with_client(
        dir,
        config,
        repo,
        bus,
        Arc::new(StubDocClient::new(CrudPatterns::default())),
    )
}

fn manager_with_client(
    dir: &TempDir,
    config: QueueConfig,
    repo: Arc<TaskRepository>,
    bus: Arc<EventBus>,
    client: Arc<dyn DocClient>,
) -> QueueManager {
    let writer = OutputWriter::new(dir.path());
    let pipeline = Pipeline {
        analyzer: Arc::new(StubAnalyzer::new()),
        client,
        packager: ContextPackager::new(writer.clone(), &ContextConfig::default()),
        writer,
        group_docs_by_package: false,
    };
    QueueManager::new(config, repo, bus, pipeline)
}

async fn wait_until(mut condition: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        if Instant::now() > deadline {
            panic!("Timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

// =============================================================================
// Full pipeline
// =============================================================================

#[tokio::test]
async fn test_five_tasks_two_slots_all_succeed_with_artifacts() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path());
    let bus = create_event_bus();
    let repo = Arc::new(TaskRepository::new(bus.clone()));
    let manager = stub_manager(&dir, fast_config(2), repo.clone(), bus.clone());

    let mut rx = manager.subscribe();
    let ids = manager.submit((0..5).map(|n| entry(&src, n)).collect());
    manager.start();

    let repo_wait = repo.clone();
    let ids_wait = ids.clone();
    wait_until(
        move || {
            ids_wait
                .iter()
                .all(|id| repo_wait.get(id).map(|t| t.is_terminal()).unwrap_or(false))
        },
        "all five tasks terminal",
    )
    .await;
    manager.stop();

    let mut max_running_seen = 0;
    let mut enqueued = 0;
    let mut started = 0;
    let mut finished = 0;
    let mut queue_started = 0;
    let mut queue_stopped = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            DocEvent::TaskEnqueued { .. } => enqueued += 1,
            DocEvent::TaskStarted { .. } => started += 1,
            DocEvent::TaskFinished { .. } => finished += 1,
            DocEvent::QueueStarted => queue_started += 1,
            DocEvent::QueueStopped => queue_stopped += 1,
            DocEvent::QueueHeartbeat { status } => {
                max_running_seen = max_running_seen.max(status.running_count);
            }
            _ => {}
        }
    }
    assert_eq!(enqueued, 5);
    assert_eq!(started, 5);
    assert_eq!(finished, 5);
    assert_eq!(queue_started, 1);
    assert_eq!(queue_stopped, 1);
    assert!(max_running_seen <= 2, "saw {max_running_seen} running");

    for id in &ids {
        let task = repo.get(id).unwrap();
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.progress.fraction, 1.0);

        let result = task.result.expect("result populated on success");
        let md = std::fs::read_to_string(result.md_path.unwrap()).unwrap();
        assert!(md.contains("HTTP method: GET"));
        let ctx = std::fs::read_to_string(result.ctx_path.unwrap()).unwrap();
        assert!(ctx.contains("source line 10"));
    }
}

// =============================================================================
// Retry
// =============================================================================

/// Client that always fails with a retryable-looking error
struct AlwaysFailingClient;

#[async_trait]
impl DocClient for AlwaysFailingClient {
    async fn generate(
        &self,
        _entry: &EntryPoint,
        _analysis: &AnalysisResult,
        _context_text: &str,
    ) -> Result<GeneratedDoc, LlmError> {
        Err(LlmError::ApiError {
            status: 500,
            message: "upstream unavailable".to_string(),
        })
    }
}

#[tokio::test]
async fn test_retry_ladder_ends_failed_after_max_attempts() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path());
    let bus = create_event_bus();
    let repo = Arc::new(TaskRepository::new(bus.clone()));
    let manager = manager_with_client(
        &dir,
        fast_config(2),
        repo.clone(),
        bus.clone(),
        Arc::new(AlwaysFailingClient),
    );

    let mut rx = manager.subscribe();
    let ids = manager.submit(vec![entry(&src, 0)]);
    let id = ids[0].clone();
    manager.start();

    let repo_wait = repo.clone();
    let id_wait = id.clone();
    wait_until(
        move || {
            repo_wait
                .get(&id_wait)
                .map(|t| t.status == TaskStatus::Failed)
                .unwrap_or(false)
        },
        "task permanently failed",
    )
    .await;
    manager.stop();

    let task = repo.get(&id).unwrap();
    assert_eq!(task.attempt, 2);
    assert_eq!(task.error.as_ref().unwrap().kind, "ApiError");

    // The record went queued -> running -> partial -> queued twice before
    // the final running -> failed
    let mut observed = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            DocEvent::TaskStarted { task } => observed.push(task.status),
            DocEvent::TaskUpdated { task }
                if matches!(task.status, TaskStatus::Partial | TaskStatus::Queued) =>
            {
                observed.push(task.status)
            }
            DocEvent::TaskFinished { task } => observed.push(task.status),
            _ => {}
        }
    }
    assert_eq!(
        observed,
        vec![
            TaskStatus::Running,
            TaskStatus::Partial,
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Partial,
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Failed,
        ]
    );
}

// =============================================================================
// Cancellation
// =============================================================================

/// Client slow enough to cancel mid-flight
struct SlowClient;

#[async_trait]
impl DocClient for SlowClient {
    async fn generate(
        &self,
        _entry: &EntryPoint,
        _analysis: &AnalysisResult,
        _context_text: &str,
    ) -> Result<GeneratedDoc, LlmError> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(GeneratedDoc {
            json: String::new(),
            markdown: "# ok".to_string(),
        })
    }
}

#[tokio::test]
async fn test_cancel_running_task_releases_slot_without_retry() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path());
    let bus = create_event_bus();
    let repo = Arc::new(TaskRepository::new(bus.clone()));
    let manager = manager_with_client(
        &dir,
        fast_config(1),
        repo.clone(),
        bus.clone(),
        Arc::new(SlowClient),
    );

    let ids = manager.submit(vec![entry(&src, 0), entry(&src, 1)]);
    manager.start();

    let repo_wait = repo.clone();
    let first = ids[0].clone();
    wait_until(
        move || {
            repo_wait
                .get(&first)
                .map(|t| t.status == TaskStatus::Running)
                .unwrap_or(false)
        },
        "first task running",
    )
    .await;

    manager.cancel(&ids[0]);

    // The slot opens and the second task runs to completion
    let repo_wait = repo.clone();
    let second = ids[1].clone();
    wait_until(
        move || {
            repo_wait
                .get(&second)
                .map(|t| t.is_terminal())
                .unwrap_or(false)
        },
        "second task terminal",
    )
    .await;
    manager.stop();

    let cancelled = repo.get(&ids[0]).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert_eq!(cancelled.error.unwrap().kind, "CANCELLED");
    assert_eq!(cancelled.attempt, 0);
    assert_eq!(repo.get(&ids[1]).unwrap().status, TaskStatus::Succeeded);
}

// =============================================================================
// Resume across a restart
// =============================================================================

#[tokio::test]
async fn test_resume_from_persisted_history() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path());
    let history = dir.path().join("history.jsonl");

    // First "process": record one task mid-run and one already done
    {
        let bus = create_event_bus();
        let repo = TaskRepository::with_persistence(bus, &history, 100);

        let mut interrupted = TaskRecord::with_id("interrupted-1", entry(&src, 0));
        interrupted.set_status(TaskStatus::Running);
        interrupted.set_progress(0.35, "Generating");
        repo.updated(&interrupted);

        let mut done = TaskRecord::with_id("done-1", entry(&src, 1));
        done.set_status(TaskStatus::Succeeded);
        repo.updated(&done);
    }

    // Second "process": resume from the same history file
    let bus = create_event_bus();
    let repo = Arc::new(TaskRepository::with_persistence(bus.clone(), &history, 100));
    let manager = stub_manager(&dir, fast_config(2), repo.clone(), bus.clone());

    let resumed = manager.auto_resume();
    assert_eq!(resumed, 1);

    // The re-admitted record was reset before re-submission
    let reset = repo.get("interrupted-1").unwrap();
    assert!(matches!(reset.status, TaskStatus::Queued | TaskStatus::Running | TaskStatus::Succeeded));

    let repo_wait = repo.clone();
    wait_until(
        move || {
            repo_wait
                .get("interrupted-1")
                .map(|t| t.status == TaskStatus::Succeeded)
                .unwrap_or(false)
        },
        "resumed task succeeded",
    )
    .await;
    manager.stop();

    // The finished task was left alone
    assert_eq!(repo.get("done-1").unwrap().status, TaskStatus::Succeeded);
}

// =============================================================================
// Heartbeat throttling
// =============================================================================

#[tokio::test]
async fn test_heartbeats_are_throttled() {
    let dir = TempDir::new().unwrap();
    let src = write_source(dir.path());
    let bus = create_event_bus();
    let repo = Arc::new(TaskRepository::new(bus.clone()));
    // Very fast ticking: a heartbeat is attempted every ~5ms
    let manager = stub_manager(&dir, fast_config(2), repo.clone(), bus.clone());

    let mut rx = manager.subscribe();
    manager.submit((0..20).map(|n| entry(&src, n)).collect());
    manager.start();

    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(600)).await;
    manager.stop();
    let window = started.elapsed();

    let mut heartbeats = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, DocEvent::QueueHeartbeat { .. }) {
            heartbeats += 1;
        }
    }
    let allowed = window.as_millis() as usize / 250 + 2;
    assert!(
        heartbeats <= allowed,
        "{heartbeats} heartbeats in {window:?}, allowed {allowed}"
    );
    assert!(heartbeats >= 1);
}
