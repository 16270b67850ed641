//! Error types for crop extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while reading frames or writing crops.
///
/// A frame without a usable face is not an error; croppers return `None`.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Frame source unavailable: {0}")]
    SourceUnavailable(PathBuf),

    #[error("Face detection failed: {0}")]
    DetectionFailed(String),

    #[error("Invalid margin range: {low}..{high}")]
    InvalidMargin { low: f64, high: f64 },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
