//! Identity-aligned frame sampling for EFF++.
//!
//! This crate provides:
//! - Frame Count Index loading from per-variant CSV tables
//! - Split metadata loading and the Identity Grouper
//! - The Frame Alignment Engine and its deterministic output shuffle
//! - The Pair Manifest Builder
//! - Persistence of alignment records, manifests and summaries

pub mod error;
pub mod frame_counts;
pub mod grouper;
pub mod metrics;
pub mod pairs;
pub mod persist;
pub mod sampler;

pub use error::{AlignError, AlignResult};
pub use frame_counts::FrameCountIndex;
pub use grouper::{load_split_metadata, GroupingOutcome, IdentityGrouper, SplitEntry};
pub use pairs::{build_all_pairs, build_pairs, pair_manifest_path, FrameLayout, DEFAULT_FRAME_EXT};
pub use persist::{
    load_alignment_records, load_alignment_summary, load_pair_manifest, write_alignment,
    write_json, write_pair_manifest,
};
pub use sampler::{
    align, build_alignment, compute_frame_offsets, AlignmentPlan, AlignmentRun, DEFAULT_SEED,
    DEFAULT_TARGET_K,
};
