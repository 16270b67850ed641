//! Describer client error types.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

/// Body phrases that mark a 403 as throttling rather than a credential problem.
static LIMIT_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)quota|rate[ _-]?limit|exceeded|overloaded",
        r"|too many requests|resource[ _-]?exhausted",
    ))
    .unwrap()
});

/// Longest body excerpt kept in an error.
const BODY_EXCERPT_CHARS: usize = 512;

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Errors from describer sessions.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited (HTTP {status}): {body}")]
    RateLimited { status: u16, body: String },

    #[error("Server error (HTTP {status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Request rejected (HTTP {status}): {body}")]
    RequestRejected { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Local model failed: {0}")]
    LocalModel(String),

    #[error("Retry budget exhausted after {attempts} retries: {last}")]
    RetryExhausted { attempts: u32, last: Box<LlmError> },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn local_model(msg: impl Into<String>) -> Self {
        Self::LocalModel(msg.into())
    }

    /// Classify a non-200 response.
    ///
    /// - 429, 503, and 403 with a limiting phrase in the body: rate limited
    /// - 500, 502, 504 and other 5xx: retryable server error
    /// - any other 4xx: terminal
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let body_excerpt = excerpt(body);
        match status {
            429 | 503 => Self::RateLimited {
                status,
                body: body_excerpt,
            },
            403 if LIMIT_KEYWORDS.is_match(body) => Self::RateLimited {
                status,
                body: body_excerpt,
            },
            500..=599 => Self::ServerError {
                status,
                body: body_excerpt,
            },
            _ => Self::RequestRejected {
                status,
                body: body_excerpt,
            },
        }
    }

    /// Throttling, quota or overload signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Worth another attempt after backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. }
                | LlmError::ServerError { .. }
                | LlmError::Timeout(_)
                | LlmError::Network(_)
        )
    }

    /// Fails the current frame immediately.
    pub fn is_terminal(&self) -> bool {
        !self.is_retryable()
    }

    /// HTTP status behind this error, following exhausted retries.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::RateLimited { status, .. }
            | LlmError::ServerError { status, .. }
            | LlmError::RequestRejected { status, .. } => Some(*status),
            LlmError::RetryExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Short label for metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            LlmError::RateLimited { .. } => "rate_limited",
            LlmError::ServerError { .. } => "server_error",
            LlmError::RequestRejected { .. } => "rejected",
            LlmError::InvalidResponse(_) | LlmError::Json(_) => "invalid_response",
            LlmError::Timeout(_) => "timeout",
            LlmError::Network(_) => "network",
            LlmError::Config(_) => "config",
            LlmError::LocalModel(_) => "local_model",
            LlmError::RetryExhausted { .. } => "exhausted",
        }
    }
}
