//! Stub analysis backend
//!
//! Produces a placeholder summary and a small anchor window around the
//! entry declaration so the rest of the pipeline can run without a real
//! callgraph engine.

use async_trait::async_trait;

use crate::domain::EntryPoint;

use super::{AnalysisError, AnalysisResult, Analyzer, SliceAnchor};

/// Context lines included on each side of the entry declaration
const ANCHOR_PADDING: u32 = 2;

#[derive(Debug, Default)]
pub struct StubAnalyzer;

impl StubAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(&self, entry: &EntryPoint) -> Result<AnalysisResult, AnalysisError> {
        Ok(AnalysisResult {
            summary: format!("[stub] callgraph+slice for {}#{}", entry.class_fqn, entry.method),
            anchors: vec![SliceAnchor {
                file: entry.file.clone(),
                start_line: entry.line.saturating_sub(ANCHOR_PADDING).max(1),
                end_line: entry.line + ANCHOR_PADDING,
            }],
        })
    }
}
