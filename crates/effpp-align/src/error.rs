//! Error types for alignment and pair resolution.

use std::path::PathBuf;
use thiserror::Error;

use effpp_models::ModelError;

/// Result type for alignment operations.
pub type AlignResult<T> = Result<T, AlignError>;

/// Errors raised while loading inputs or persisting outputs.
///
/// Incomplete identities are not errors; they are counted as
/// [`effpp_models::RejectReason`]s.
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Missing column '{column}' in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AlignError {
    pub fn missing_column(file: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            file: file.into(),
            column: column.into(),
        }
    }

    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}
