//! Generation clients
//!
//! A [`DocClient`] turns an entry point plus analysis output and context
//! text into a generated document. The HTTP client speaks
//! OpenAI-compatible, Ollama and DeepSeek chat-completions endpoints; the
//! stub client produces deterministic offline documents.

use std::sync::Arc;

use tracing::debug;

use crate::config::{LlmConfig, PromptConfig};
use crate::domain::CrudPatterns;
use crate::prompt::PromptBuilder;

pub mod client;
mod error;
mod http;
mod stub;

pub use client::{DocClient, GeneratedDoc};
pub use error::LlmError;
pub use http::HttpDocClient;
pub use stub::StubDocClient;

/// Create a generation client based on the provider specified in config
///
/// Supports "stub", "openai", "ollama" and "deepseek" providers.
pub fn create_client(
    config: &LlmConfig,
    prompt_config: &PromptConfig,
    patterns: CrudPatterns,
) -> Result<Arc<dyn DocClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "stub" => Ok(Arc::new(StubDocClient::new(patterns))),
        "openai" | "ollama" | "deepseek" => {
            let prompt = PromptBuilder::new(prompt_config, patterns);
            Ok(Arc::new(HttpDocClient::from_config(config, prompt)?))
        }
        other => Err(LlmError::InvalidResponse(format!(
            "Unknown LLM provider: '{}'. Supported: stub, openai, ollama, deepseek",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_stub() {
        let config = LlmConfig::default();
        assert!(create_client(&config, &PromptConfig::default(), CrudPatterns::default()).is_ok());
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let config = LlmConfig {
            provider: "anthropic".to_string(),
            ..LlmConfig::default()
        };
        let err = create_client(&config, &PromptConfig::default(), CrudPatterns::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }
}
