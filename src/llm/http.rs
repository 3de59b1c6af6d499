//! HTTP generation client
//!
//! Speaks chat-completions endpoints in three flavors: OpenAI-compatible
//! (vLLM and friends), Ollama and DeepSeek. The prompt asks for markdown
//! only, so the whole response content becomes the markdown artifact.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::config::LlmConfig;
use crate::domain::EntryPoint;
use crate::prompt::PromptBuilder;

use super::{DocClient, GeneratedDoc, LlmError};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant for API documentation. Answer in Markdown only.";

/// Endpoint flavor, derived from provider name and endpoint hints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    OpenAi,
    Ollama,
    DeepSeek,
}

pub struct HttpDocClient {
    http: reqwest::Client,
    config: LlmConfig,
    prompt: PromptBuilder,
    auth_token: Option<String>,
    flavor: Flavor,
}

impl HttpDocClient {
    pub fn from_config(config: &LlmConfig, prompt: PromptBuilder) -> Result<Self, LlmError> {
        debug!(endpoint = %config.endpoint, model = %config.model, "HttpDocClient::from_config: called");
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()?;

        let auth_token = if config.auth_token_env.is_empty() {
            None
        } else {
            std::env::var(&config.auth_token_env).ok().filter(|t| !t.trim().is_empty())
        };

        Ok(Self {
            http,
            flavor: detect_flavor(config),
            config: config.clone(),
            prompt,
            auth_token,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        match self.flavor {
            Flavor::Ollama => json!({
                "model": self.config.model,
                "messages": [
                    {"role": "user", "content": prompt}
                ],
                "stream": false,
            }),
            Flavor::DeepSeek => {
                // Some configs carry a generic model name; map it onto a
                // DeepSeek one unless it already is one
                let model = if self.config.model.starts_with("deepseek")
                    || self.config.model.contains("chat")
                    || self.config.model.contains("reasoner")
                {
                    self.config.model.clone()
                } else {
                    "deepseek-chat".to_string()
                };
                json!({
                    "model": model,
                    "messages": [
                        {"role": "system", "content": SYSTEM_PROMPT},
                        {"role": "user", "content": prompt}
                    ],
                    "stream": false,
                    "max_tokens": self.config.max_tokens,
                    "temperature": self.config.temperature,
                    "top_p": self.config.top_p,
                })
            }
            Flavor::OpenAi => json!({
                "model": self.config.model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": prompt}
                ],
                "stream": false,
                "max_tokens": self.config.max_tokens,
                "temperature": self.config.temperature,
                "top_p": self.config.top_p,
            }),
        }
    }

    fn extract_content(&self, body: &Value) -> Option<String> {
        let content = match self.flavor {
            Flavor::Ollama => body.pointer("/message/content")?,
            Flavor::OpenAi | Flavor::DeepSeek => body.pointer("/choices/0/message/content")?,
        };
        content.as_str().map(|s| s.to_string())
    }
}

fn detect_flavor(config: &LlmConfig) -> Flavor {
    if config.provider == "ollama"
        || config.endpoint.contains("/api/chat")
        || config.endpoint.contains(":11434")
    {
        Flavor::Ollama
    } else if config.provider == "deepseek" || config.endpoint.contains("api.deepseek.com") {
        Flavor::DeepSeek
    } else {
        Flavor::OpenAi
    }
}

/// Remove reasoning blocks like `<think> ... </think>`
fn strip_think_tags(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?is)<\s*think\s*>.*?<\s*/\s*think\s*>").expect("valid think-tag regex")
    });
    re.replace_all(text, "").trim().to_string()
}

/// Undo the HTML-entity escaping some backends apply to generics
fn cleanup_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("\\u003c", "<")
        .replace("\\u003e", ">")
}

#[async_trait]
impl DocClient for HttpDocClient {
    async fn generate(
        &self,
        entry: &EntryPoint,
        _analysis: &AnalysisResult,
        context_text: &str,
    ) -> Result<GeneratedDoc, LlmError> {
        debug!(class_fqn = %entry.class_fqn, method = %entry.method, "HttpDocClient::generate: called");
        let prompt = self
            .prompt
            .build(entry, context_text)
            .map_err(|e| LlmError::Template(e.to_string()))?;

        let mut request = self
            .http
            .post(&self.config.endpoint)
            .json(&self.request_body(&prompt));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(Duration::from_secs(self.config.timeout_sec))
            } else {
                LlmError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let snippet: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(240)
                .collect();
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: snippet,
            });
        }

        let body: Value = response.json().await?;
        let content = self
            .extract_content(&body)
            .ok_or_else(|| LlmError::InvalidResponse("no content field in response".to_string()))?;

        let markdown = cleanup_entities(&strip_think_tags(&content)).trim().to_string();
        Ok(GeneratedDoc {
            json: String::new(),
            markdown,
        })
    }
}
