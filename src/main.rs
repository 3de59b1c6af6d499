//! docdaemon CLI entry point

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use docdaemon::cli::{Cli, Command};
use docdaemon::config::Config;
use docdaemon::domain::{EntryPoint, TaskRecord, TaskScope, TaskStatus};
use docdaemon::events::{DocEvent, create_event_bus};
use docdaemon::history::TaskRepository;
use docdaemon::queue::QueueManager;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docdaemon")
        .join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file =
        fs::File::create(log_dir.join("docdaemon.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

fn open_repository(config: &Config) -> (Arc<docdaemon::events::EventBus>, Arc<TaskRepository>) {
    let bus = create_event_bus();
    let repo = Arc::new(TaskRepository::with_persistence(
        bus.clone(),
        config.storage.resolved_history_file(),
        config.storage.history_limit,
    ));
    (bus, repo)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;
    info!(
        provider = %config.llm.provider,
        analysis = %config.analysis.backend,
        "docdaemon loaded config"
    );

    match cli.command {
        Command::Run { entries, class_scope } => cmd_run(&config, &entries, class_scope).await,
        Command::Resume => cmd_resume(&config).await,
        Command::Status => cmd_status(&config),
    }
}

async fn cmd_run(config: &Config, entries_path: &Path, class_scope: bool) -> Result<()> {
    let content = fs::read_to_string(entries_path)
        .with_context(|| format!("Failed to read entries file {}", entries_path.display()))?;
    let entries: Vec<EntryPoint> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse entries file {}", entries_path.display()))?;
    if entries.is_empty() {
        println!("No entry points in {}", entries_path.display());
        return Ok(());
    }

    let (bus, repo) = open_repository(config);
    let manager = QueueManager::from_config(config, repo.clone(), bus)?;

    let scope = if class_scope { TaskScope::Class } else { TaskScope::Method };
    let tasks: Vec<TaskRecord> = entries
        .into_iter()
        .map(|entry| TaskRecord::new(entry).with_scope(scope))
        .collect();
    let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();

    // Subscribe before submission so no terminal event can be missed
    let mut rx = manager.subscribe();

    println!("Submitted {} tasks", ids.len());
    manager.submit_tasks(tasks);
    manager.start();

    // Watch the event stream until every submitted task is terminal
    let mut remaining: HashSet<String> = ids.iter().cloned().collect();
    while !remaining.is_empty() {
        match rx.recv().await {
            Ok(DocEvent::TaskFinished { task }) => {
                if remaining.remove(&task.id) {
                    println!(
                        "  [{}] {}#{}",
                        task.status,
                        task.entry.class_fqn,
                        task.entry.method_base()
                    );
                }
            }
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                // Missed events; reconcile against the repository
                remaining.retain(|id| repo.get(id).map(|t| !t.is_terminal()).unwrap_or(true));
            }
            Err(_) => break,
        }
    }

    manager.stop();
    print_summary(&repo, &ids);
    Ok(())
}

async fn cmd_resume(config: &Config) -> Result<()> {
    let (bus, repo) = open_repository(config);
    let manager = QueueManager::from_config(config, repo.clone(), bus)?;

    let resumed = manager.auto_resume();
    if resumed == 0 {
        println!("No pending tasks to resume");
        return Ok(());
    }
    println!("Resumed {resumed} pending tasks");

    while !manager.is_idle() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    manager.stop();

    let ids: Vec<String> = repo.all().into_iter().map(|t| t.id).collect();
    print_summary(&repo, &ids);
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    let (_bus, repo) = open_repository(config);
    let tasks = repo.all();
    if tasks.is_empty() {
        println!("No task history");
        return Ok(());
    }

    for status in [
        TaskStatus::Queued,
        TaskStatus::Running,
        TaskStatus::Partial,
        TaskStatus::Succeeded,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ] {
        let count = tasks.iter().filter(|t| t.status == status).count();
        if count > 0 {
            println!("{status:>10}: {count}");
        }
    }
    println!("{:>10}: {}", "total", tasks.len());
    Ok(())
}

fn print_summary(repo: &TaskRepository, ids: &[String]) {
    let mut succeeded = 0;
    let mut failed = Vec::new();
    let mut cancelled = 0;
    for id in ids {
        if let Some(task) = repo.get(id) {
            match task.status {
                TaskStatus::Succeeded => succeeded += 1,
                TaskStatus::Cancelled => cancelled += 1,
                TaskStatus::Failed => failed.push(task),
                _ => {}
            }
        }
    }

    println!();
    println!("Done: {succeeded} succeeded, {} failed, {cancelled} cancelled", failed.len());
    for task in failed {
        let reason = task
            .error
            .map(|e| format!("{}: {}", e.kind, e.message))
            .unwrap_or_else(|| "unknown error".to_string());
        println!("  failed {}#{}: {}", task.entry.class_fqn, task.entry.method_base(), reason);
    }
}
