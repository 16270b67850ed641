//! Annotation records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::variant::Variant;
use crate::video::{IdentityKey, Split};

/// Canonical question every record answers.
pub const ANNOTATION_QUESTION: &str = "Is this image manipulated?";

/// Which describer backend produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DescriberKind {
    Placeholder,
    LocalModel,
    Http,
    Resilient,
}

impl DescriberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriberKind::Placeholder => "placeholder",
            DescriberKind::LocalModel => "local_model",
            DescriberKind::Http => "http",
            DescriberKind::Resilient => "resilient",
        }
    }
}

impl fmt::Display for DescriberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the describer state that produced one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DescriberProvenance {
    pub kind: DescriberKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Endpoint host of the slot that answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_slot_index: Option<usize>,
    /// `official` or `proxy`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_slot_kind: Option<String>,
    #[serde(default)]
    pub escalated_to_proxy: bool,
    #[serde(default)]
    pub retry_budget: u32,
    #[serde(default)]
    pub retry_delay_ms: u64,
}

impl DescriberProvenance {
    /// Provenance for backends without slots or retries.
    pub fn simple(kind: DescriberKind, model: Option<String>) -> Self {
        Self {
            kind,
            model,
            provider: None,
            active_slot_index: None,
            active_slot_kind: None,
            escalated_to_proxy: false,
            retry_budget: 0,
            retry_delay_ms: 0,
        }
    }
}

/// Sampling parameters stamped into each annotation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AlignmentParams {
    pub k: usize,
    pub seed: u64,
}

/// Reproducibility metadata stamped into every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub alignment: AlignmentParams,
    pub describer: DescriberProvenance,
}

/// The pair manifest entry a record describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PairReference {
    pub identity: IdentityKey,
    pub rank: u32,
    pub offset: u32,
    pub variant: Variant,
    pub split: Split,
    pub video_id: String,
    pub authentic_frame_path: PathBuf,
    pub target_frame_path: PathBuf,
}

/// One question/answer record per (identity, rank, variant). Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnnotationRecord {
    pub question: String,
    pub manipulated: bool,
    #[serde(rename = "answer")]
    pub answer_text: String,
    pub rationale: String,
    #[serde(rename = "evidence_tags")]
    pub rationale_tags: Vec<String>,
    #[serde(default)]
    pub technique_summary: String,
    pub pair: PairReference,
    pub run_metadata: RunMetadata,
}

impl AnnotationRecord {
    /// File name of the record for `rank`.
    pub fn file_name(rank: u32) -> String {
        format!("frame_{:04}.ann.json", rank)
    }
}
