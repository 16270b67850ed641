//! Shared data models for the EFF++ annotation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Video variants (one authentic, four manipulation methods)
//! - Identity families and their alignment records
//! - Pair manifests resolved against extracted frame files
//! - Annotation records and the run metadata stamped into them
//! - Evidence tag tables and technique summaries

pub mod alignment;
pub mod annotation;
pub mod error;
pub mod evidence;
pub mod family;
pub mod pair;
pub mod variant;
pub mod video;

// Re-export common types
pub use alignment::{AlignmentRecord, AlignmentSummary, SplitHistogram, SplitManifestEntry};
pub use annotation::{
    AlignmentParams, AnnotationRecord, DescriberKind, DescriberProvenance, PairReference,
    RunMetadata, ANNOTATION_QUESTION,
};
pub use error::{ModelError, ModelResult};
pub use evidence::{EvidenceTagTable, TechniqueSummaries};
pub use family::{IdentityFamily, RejectReason};
pub use pair::{frame_file_name, FramePair, PairManifest};
pub use variant::Variant;
pub use video::{IdentityKey, Split, VideoDescriptor};
