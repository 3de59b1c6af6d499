//! Task executor: runs one task to a terminal or retryable outcome
//!
//! Phases are strictly sequential per task: analyze, package context,
//! generate, write artifacts. Cancellation is advisory and checked at the
//! phase boundaries; every status or progress mutation is recorded in the
//! repository (which publishes the matching task event) and attempts a
//! heartbeat.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::analysis::Analyzer;
use crate::context::ContextPackager;
use crate::domain::{TaskError, TaskRecord, TaskScope, TaskStatus};
use crate::history::TaskRepository;
use crate::llm::DocClient;
use crate::output::{OutputWriter, safe_file_name, unwrap_markdown_fence};

use super::status::StatusPublisher;

/// The pluggable collaborators the executor drives
pub struct Pipeline {
    pub analyzer: Arc<dyn Analyzer>,
    pub client: Arc<dyn DocClient>,
    pub packager: ContextPackager,
    pub writer: OutputWriter,
    pub group_docs_by_package: bool,
}

/// How one execution attempt ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Terminal success; record already finalized
    Succeeded,
    /// Terminal cancellation; record already finalized, never retried
    Cancelled,
    /// The failure is the retry controller's to route
    Failed { error: TaskError },
}

pub struct TaskExecutor {
    pipeline: Pipeline,
    repo: Arc<TaskRepository>,
    publisher: Arc<StatusPublisher>,
}

impl TaskExecutor {
    pub fn new(pipeline: Pipeline, repo: Arc<TaskRepository>, publisher: Arc<StatusPublisher>) -> Self {
        Self {
            pipeline,
            repo,
            publisher,
        }
    }

    /// Run one attempt for `task`, mutating it through its phases
    pub async fn execute(&self, task: &mut TaskRecord, token: &CancellationToken) -> ExecOutcome {
        debug!(id = %task.id, attempt = task.attempt, "TaskExecutor::execute: called");

        self.update(task, 0.05, "Analyzing", true);
        if token.is_cancelled() {
            return self.finish_cancelled(task);
        }

        let analysis = match self.pipeline.analyzer.analyze(&task.entry).await {
            Ok(analysis) => analysis,
            Err(e) => return ExecOutcome::Failed {
                error: TaskError::new("AnalysisError", e.to_string()),
            },
        };
        task.analysis_summary = Some(analysis.summary.clone());

        self.update(task, 0.35, "Generating", false);
        if token.is_cancelled() {
            return self.finish_cancelled(task);
        }

        let safe = safe_file_name(&task.id);
        let ctx_rel = format!("context-bundles/{safe}.txt");
        let bundle = match task.scope {
            TaskScope::Class => self.pipeline.packager.build_for_class(&task.entry, &analysis, &ctx_rel),
            TaskScope::Method => self.pipeline.packager.build(&task.entry, &analysis, &ctx_rel),
        };
        let bundle = match bundle {
            Ok(bundle) => bundle,
            Err(e) => return ExecOutcome::Failed {
                error: TaskError::new("ContextError", e.to_string()),
            },
        };

        let doc = match self.pipeline.client.generate(&task.entry, &analysis, &bundle.text).await {
            Ok(doc) => doc,
            Err(e) => return ExecOutcome::Failed {
                error: TaskError::new(e.kind(), e.to_string()),
            },
        };

        self.update(task, 0.65, "Writing output", false);
        if token.is_cancelled() {
            return self.finish_cancelled(task);
        }

        let json_path = if doc.json.is_empty() {
            None
        } else {
            match self
                .pipeline
                .writer
                .write_relative(&format!("method-docs/{safe}.json"), &doc.json)
            {
                Ok(path) => Some(path.to_string_lossy().into_owned()),
                Err(e) => return ExecOutcome::Failed {
                    error: TaskError::new("IoError", e.to_string()),
                },
            }
        };

        let markdown = unwrap_markdown_fence(&doc.markdown);
        let md_rel = match task.entry.package() {
            Some(pkg) if self.pipeline.group_docs_by_package => {
                format!("docs/{}/{safe}.md", safe_file_name(pkg))
            }
            _ => format!("docs/{safe}.md"),
        };
        let md_path = match self.pipeline.writer.write_relative(&md_rel, &markdown) {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(e) => return ExecOutcome::Failed {
                error: TaskError::new("IoError", e.to_string()),
            },
        };

        task.result = Some(crate::domain::TaskResult {
            json_path,
            md_path: Some(md_path),
            ctx_path: Some(bundle.path),
        });
        task.set_status(TaskStatus::Succeeded);
        task.set_progress(1.0, "Done");
        self.repo.finished(task);
        self.publisher.heartbeat();
        ExecOutcome::Succeeded
    }

    fn update(&self, task: &mut TaskRecord, fraction: f64, message: &str, starting: bool) {
        task.set_status(TaskStatus::Running);
        task.set_progress(fraction, message);
        if starting {
            self.repo.started(task);
        } else {
            self.repo.updated(task);
        }
        self.publisher.heartbeat();
    }

    fn finish_cancelled(&self, task: &mut TaskRecord) -> ExecOutcome {
        warn!(id = %task.id, "TaskExecutor: task cancelled");
        task.set_status(TaskStatus::Cancelled);
        task.set_error(TaskError::cancelled());
        self.repo.finished(task);
        self.publisher.heartbeat();
        ExecOutcome::Cancelled
    }
}
