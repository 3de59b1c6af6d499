//! DocClient trait definition

use async_trait::async_trait;

use crate::analysis::AnalysisResult;
use crate::domain::EntryPoint;

use super::LlmError;

/// A generated document: optional machine-readable JSON plus markdown
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratedDoc {
    /// JSON artifact; empty when the generator produced markdown only
    pub json: String,

    /// Markdown document body
    pub markdown: String,
}

/// Stateless generation client; each call is independent
#[async_trait]
pub trait DocClient: Send + Sync {
    /// Generate a document for one entry point from its analysis output
    /// and assembled context text
    async fn generate(
        &self,
        entry: &EntryPoint,
        analysis: &AnalysisResult,
        context_text: &str,
    ) -> Result<GeneratedDoc, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock generation client for unit tests
    pub struct MockDocClient {
        responses: Vec<GeneratedDoc>,
        call_count: AtomicUsize,
    }

    impl MockDocClient {
        pub fn new(responses: Vec<GeneratedDoc>) -> Self {
            Self {
                responses,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocClient for MockDocClient {
        async fn generate(
            &self,
            _entry: &EntryPoint,
            _analysis: &AnalysisResult,
            _context_text: &str,
        ) -> Result<GeneratedDoc, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(idx)
                .cloned()
                .ok_or_else(|| LlmError::InvalidResponse("No more mock responses".to_string()))
        }
    }
}
