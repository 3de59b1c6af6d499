//! Generation error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during document generation
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Prompt template error: {0}")]
    Template(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether retrying the same request could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::ApiError { status, .. } => *status == 429 || *status >= 500,
            LlmError::Network(_) => true,
            LlmError::Timeout(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::Template(_) => false,
            LlmError::Json(_) => false,
        }
    }

    /// Error kind recorded on the task record
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::ApiError { .. } => "ApiError",
            LlmError::Network(_) => "Network",
            LlmError::InvalidResponse(_) => "InvalidResponse",
            LlmError::Timeout(_) => "Timeout",
            LlmError::Template(_) => "Template",
            LlmError::Json(_) => "Json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            LlmError::ApiError {
                status: 500,
                message: "Server error".to_string()
            }
            .is_retryable()
        );
        assert!(
            LlmError::ApiError {
                status: 429,
                message: "Too many requests".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "Bad request".to_string()
            }
            .is_retryable()
        );
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::InvalidResponse("Bad JSON".to_string()).is_retryable());
    }

    #[test]
    fn test_kind() {
        assert_eq!(
            LlmError::ApiError {
                status: 500,
                message: String::new()
            }
            .kind(),
            "ApiError"
        );
        assert_eq!(LlmError::InvalidResponse(String::new()).kind(), "InvalidResponse");
    }
}
