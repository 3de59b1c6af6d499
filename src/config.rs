//! docdaemon configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::CrudPatterns;
use crate::queue::QueueConfig;

/// Main docdaemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Queue/scheduler limits and retry policy
    pub queue: QueueConfig,

    /// Generation backend configuration
    pub llm: LlmConfig,

    /// Analysis backend configuration
    pub analysis: AnalysisConfig,

    /// Context bundle limits
    pub context: ContextConfig,

    /// Artifact output configuration
    pub output: OutputConfig,

    /// Task history persistence
    pub storage: StorageConfig,

    /// Prompt template configuration
    pub prompt: PromptConfig,

    /// CRUD method-name prefixes for HTTP verb inference
    pub crud: CrudPatterns,
}

impl Config {
    /// Load configuration with fallback chain:
    /// explicit path → `./.docdaemon.yml` → `~/.config/docdaemon/docdaemon.yml` → defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".docdaemon.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("docdaemon").join("docdaemon.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate configuration before use; fails fast with clear messages
    pub fn validate(&self) -> Result<()> {
        if self.queue.max_concurrent_requests < 1 {
            return Err(eyre::eyre!("queue.max-concurrent-requests must be at least 1"));
        }
        if self.queue.requests_per_second <= 0.0 {
            return Err(eyre::eyre!("queue.requests-per-second must be positive"));
        }
        if self.queue.queue_size < 1 {
            return Err(eyre::eyre!("queue.queue-size must be at least 1"));
        }
        if self.queue.retry.max_attempts < 1 {
            return Err(eyre::eyre!("queue.retry.max-attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "stub", "openai", "ollama" or "deepseek"
    pub provider: String,

    /// Chat-completions endpoint URL
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// Environment variable holding the bearer token (empty = no auth)
    #[serde(rename = "auth-token-env")]
    pub auth_token_env: String,

    /// Request timeout in seconds
    #[serde(rename = "timeout-sec")]
    pub timeout_sec: u64,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f64,

    /// Nucleus sampling parameter
    #[serde(rename = "top-p")]
    pub top_p: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "stub".to_string(),
            endpoint: "http://127.0.0.1:8000/v1/chat/completions".to_string(),
            model: "Qwen-32B".to_string(),
            auth_token_env: String::new(),
            timeout_sec: 60,
            max_tokens: 4096,
            temperature: 0.7,
            top_p: 1.0,
        }
    }
}

/// Analysis backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Backend name; only "stub" is built in
    pub backend: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            backend: "stub".to_string(),
        }
    }
}

/// Context bundle limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Hard cap on bundle text length in characters
    #[serde(rename = "max-chars")]
    pub max_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { max_chars: 20_000 }
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory artifacts are written under; defaults to the
    /// current working directory when unset
    pub root: Option<PathBuf>,

    /// Group markdown docs into per-package folders under `docs/`
    #[serde(rename = "group-docs-by-package")]
    pub group_docs_by_package: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: None,
            group_docs_by_package: false,
        }
    }
}

/// Task history persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// History file path; defaults to `<data dir>/docdaemon/history.jsonl`
    #[serde(rename = "history-file")]
    pub history_file: Option<PathBuf>,

    /// Maximum retained task records
    #[serde(rename = "history-limit")]
    pub history_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_file: None,
            history_limit: 200,
        }
    }
}

impl StorageConfig {
    /// Resolve the history file path, falling back to the user data dir
    pub fn resolved_history_file(&self) -> PathBuf {
        if let Some(path) = &self.history_file {
            return path.clone();
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docdaemon")
            .join("history.jsonl")
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Use the custom template instead of the built-in one
    #[serde(rename = "custom-enabled")]
    pub custom_enabled: bool,

    /// Handlebars template; see the prompt module for available variables
    #[serde(rename = "custom-template")]
    pub custom_template: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            custom_enabled: false,
            custom_template: String::new(),
        }
    }
}
