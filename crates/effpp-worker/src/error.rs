//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors from the annotation pipeline.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Stage failed: {0}")]
    StageFailed(String),

    #[error("Worker {worker} aborted: {message}")]
    WorkerAborted { worker: usize, message: String },

    #[error("Alignment error: {0}")]
    Align(#[from] effpp_align::AlignError),

    #[error("Describer error: {0}")]
    Describer(#[from] effpp_llm_client::LlmError),

    #[error("Model error: {0}")]
    Model(#[from] effpp_models::ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn stage_failed(msg: impl Into<String>) -> Self {
        Self::StageFailed(msg.into())
    }

    /// Configuration problems abort the run before any work starts.
    pub fn is_fatal_config(&self) -> bool {
        match self {
            WorkerError::ConfigError(_) => true,
            WorkerError::Describer(e) => matches!(e, effpp_llm_client::LlmError::Config(_)),
            _ => false,
        }
    }
}
