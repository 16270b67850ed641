//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors from loading model tables.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unknown variant: {0}")]
    UnknownVariant(String),

    #[error("Invalid evidence table: {0}")]
    InvalidEvidenceTable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid_evidence_table(msg: impl Into<String>) -> Self {
        Self::InvalidEvidenceTable(msg.into())
    }
}
