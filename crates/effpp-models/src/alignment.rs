//! Alignment records and their summaries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::family::RejectReason;
use crate::variant::Variant;
use crate::video::{IdentityKey, Split, VideoDescriptor};

/// Common frame offsets sampled across all variants of one identity.
///
/// `frame_offsets` is strictly increasing, bounded by `min_length`, and has
/// `min(k, min_length)` entries. Created once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AlignmentRecord {
    pub identity: IdentityKey,
    pub primary_split: Split,
    pub min_length: u32,
    pub frame_offsets: Vec<u32>,
    pub split_consistent: bool,
    pub split_histogram: BTreeMap<String, u32>,
    pub videos: BTreeMap<Variant, VideoDescriptor>,
}

impl AlignmentRecord {
    /// Number of aligned frames.
    pub fn frame_count(&self) -> usize {
        self.frame_offsets.len()
    }

    pub fn video(&self, variant: Variant) -> Option<&VideoDescriptor> {
        self.videos.get(&variant)
    }

    /// Offset sampled at `rank`.
    pub fn offset_at(&self, rank: usize) -> Option<u32> {
        self.frame_offsets.get(rank).copied()
    }
}

/// Split-consistency histogram over accepted and excluded identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SplitHistogram {
    pub same_split: u32,
    pub cross_split: u32,
    /// Cross-split identities dropped because consistency was required.
    pub excluded_cross_split: u32,
}

/// Row of a per-split alignment manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SplitManifestEntry {
    pub identity: IdentityKey,
    pub primary_split: Split,
    pub frame_count: usize,
    pub min_length: u32,
    pub split_consistent: bool,
}

impl From<&AlignmentRecord> for SplitManifestEntry {
    fn from(record: &AlignmentRecord) -> Self {
        Self {
            identity: record.identity.clone(),
            primary_split: record.primary_split.clone(),
            frame_count: record.frame_count(),
            min_length: record.min_length,
            split_consistent: record.split_consistent,
        }
    }
}

/// Global alignment summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AlignmentSummary {
    pub total_records: usize,
    pub k: usize,
    pub seed: u64,
    pub require_consistent: bool,
    pub histogram: SplitHistogram,
    pub rejected: BTreeMap<RejectReason, u32>,
    /// Accepted identities per primary split.
    pub per_split: BTreeMap<String, usize>,
}

impl AlignmentSummary {
    pub fn record_rejection(&mut self, reason: RejectReason) {
        *self.rejected.entry(reason).or_insert(0) += 1;
    }

    pub fn rejected_total(&self) -> u32 {
        self.rejected.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_rejection_counts() {
        let mut summary = AlignmentSummary::default();
        summary.record_rejection(RejectReason::ZeroLength);
        summary.record_rejection(RejectReason::ZeroLength);
        summary.record_rejection(RejectReason::MissingVariant);
        assert_eq!(summary.rejected_total(), 3);
        assert_eq!(summary.rejected.get(&RejectReason::ZeroLength), Some(&2));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["rejected"]["zero_length"], 2);
    }
}
