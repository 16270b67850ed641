//! Structured identity logging utilities.
//!
//! Provides consistent, structured logging for per-identity work with
//! tracing spans and contextual information.

use effpp_models::{IdentityKey, Variant};
use tracing::{error, info, warn, Span};

/// Identity logger for structured logging with consistent formatting.
///
/// Every event carries the identity, the stage (`align`, `annotate`, ...)
/// and the worker that owns the identity.
#[derive(Debug, Clone)]
pub struct IdentityLogger {
    identity: String,
    operation: String,
    worker: usize,
}

impl IdentityLogger {
    /// Create a logger for one identity handled by one worker.
    ///
    /// # Arguments
    /// * `identity` - Identity whose pairs are being processed
    /// * `operation` - Stage name (e.g., "annotate")
    /// * `worker` - Index of the owning worker
    pub fn new(identity: &IdentityKey, operation: &str, worker: usize) -> Self {
        Self {
            identity: identity.to_string(),
            operation: operation.to_string(),
            worker,
        }
    }

    /// Log the start of work on the identity.
    pub fn log_start(&self, message: &str) {
        info!(
            identity = %self.identity,
            operation = %self.operation,
            worker = self.worker,
            "Identity started: {}", message
        );
    }

    /// Log a progress update for the identity.
    pub fn log_progress(&self, message: &str) {
        info!(
            identity = %self.identity,
            operation = %self.operation,
            worker = self.worker,
            "Identity progress: {}", message
        );
    }

    /// Log a recoverable problem for the identity.
    pub fn log_warning(&self, message: &str) {
        warn!(
            identity = %self.identity,
            operation = %self.operation,
            worker = self.worker,
            "Identity warning: {}", message
        );
    }

    /// Log a per-pair failure with the pair coordinates.
    pub fn log_error(&self, rank: u32, variant: Variant, status: Option<u16>, message: &str) {
        error!(
            identity = %self.identity,
            operation = %self.operation,
            worker = self.worker,
            rank,
            variant = %variant,
            status = ?status,
            "Pair failed: {}", message
        );
    }

    /// Log that every pair of the identity was handled.
    pub fn log_completion(&self, message: &str) {
        info!(
            identity = %self.identity,
            operation = %self.operation,
            worker = self.worker,
            "Identity completed: {}", message
        );
    }

    /// Get the identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Get the operation type.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span for one identity.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "identity",
            identity = %self.identity,
            operation = %self.operation,
            worker = self.worker
        )
    }

    /// Span for one describe call inside this identity.
    pub fn pair_span(&self, rank: u32, variant: Variant) -> Span {
        tracing::info_span!(
            "describe",
            identity = %self.identity,
            rank,
            variant = %variant
        )
    }
}
