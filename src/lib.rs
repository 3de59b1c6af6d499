//! docdaemon: concurrent documentation generation for code entry points
//!
//! Each submitted entry point flows through an analysis step, a text
//! generation step and an artifact-writing step, driven by a rate- and
//! concurrency-limited scheduling core. Analysis and generation backends
//! are pluggable traits; the built-in implementations cover offline stub
//! runs and OpenAI-compatible/Ollama/DeepSeek chat endpoints.
//!
//! # Core Concepts
//!
//! - **Unbounded submission, bounded look-ahead**: callers can submit a
//!   whole project scan at once; only a small admission queue is kept hot.
//! - **Two-level gating**: dispatch is capped by both an executing-task
//!   count and a hard permit pool, so races cannot oversubscribe.
//! - **Contained failures**: one task's failure never touches the
//!   scheduler or its neighbors; retries re-enter through the backlog.
//!
//! # Modules
//!
//! - [`queue`] - Scheduling core: backlog, admission, limiter, executor
//! - [`domain`] - Task records and entry points
//! - [`events`] - Event bus and event vocabulary
//! - [`history`] - Task history store with JSONL persistence
//! - [`analysis`] / [`llm`] - Pluggable analysis and generation backends
//! - [`context`] / [`output`] / [`prompt`] - Pipeline collaborators
//! - [`config`] - Configuration types and loading

pub mod analysis;
pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod events;
pub mod history;
pub mod llm;
pub mod output;
pub mod prompt;
pub mod queue;

// Re-export commonly used types
pub use analysis::{AnalysisError, AnalysisResult, Analyzer, SliceAnchor, StubAnalyzer, create_analyzer};
pub use config::{
    AnalysisConfig, Config, ContextConfig, LlmConfig, OutputConfig, PromptConfig, StorageConfig,
};
pub use context::{ContextBundle, ContextPackager};
pub use domain::{
    CrudPatterns, EntryPoint, MethodCategory, TaskError, TaskProgress, TaskRecord, TaskResult,
    TaskScope, TaskStatus, classify_method_name, now_ms,
};
pub use events::{DocEvent, EventBus, QueueStatus, create_event_bus};
pub use history::TaskRepository;
pub use llm::{DocClient, GeneratedDoc, HttpDocClient, LlmError, StubDocClient, create_client};
pub use output::{OutputWriter, safe_file_name, unwrap_markdown_fence};
pub use prompt::PromptBuilder;
pub use queue::{
    ExecOutcome, Pipeline, QueueConfig, QueueManager, RetryConfig, TaskExecutor,
};
