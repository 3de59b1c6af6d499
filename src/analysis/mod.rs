//! Analysis backends
//!
//! An [`Analyzer`] turns an entry point into a callgraph/slice summary the
//! generator can work from. Backends are selected by configuration; only
//! the stub backend is built in, real backends plug in through the trait.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::domain::EntryPoint;

mod stub;

pub use stub::StubAnalyzer;

/// A source region relevant to an entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceAnchor {
    pub file: String,
    /// 1-indexed, inclusive
    pub start_line: u32,
    pub end_line: u32,
}

/// Output of the analysis phase
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// Human-readable callgraph/slice summary
    pub summary: String,

    /// Source regions to include in the context bundle
    pub anchors: Vec<SliceAnchor>,
}

/// Errors from analysis backends
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Analysis backend error: {0}")]
    Backend(String),

    #[error("Unknown analysis backend: '{0}'. Supported: stub")]
    UnknownBackend(String),
}

/// Pluggable analysis capability
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, entry: &EntryPoint) -> Result<AnalysisResult, AnalysisError>;
}

/// Create an analyzer for the backend named in config
pub fn create_analyzer(config: &AnalysisConfig) -> Result<Arc<dyn Analyzer>, AnalysisError> {
    debug!(backend = %config.backend, "create_analyzer: called");
    match config.backend.as_str() {
        "stub" => Ok(Arc::new(StubAnalyzer::new())),
        other => Err(AnalysisError::UnknownBackend(other.to_string())),
    }
}
