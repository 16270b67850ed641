//! Authentic/target frame pairs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::variant::Variant;
use crate::video::{IdentityKey, Split};

/// File name of an extracted frame at `offset`.
pub fn frame_file_name(offset: u32, ext: &str) -> String {
    format!("frame_{:04}.{}", offset, ext)
}

/// One resolved pair. Both files existed when the manifest was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FramePair {
    pub rank: u32,
    pub offset: u32,
    pub authentic_frame_path: PathBuf,
    pub target_frame_path: PathBuf,
}

/// Resolved pairs of one (identity, variant).
///
/// Derived from an alignment record by checking file existence. Rebuilt
/// whenever inputs change, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PairManifest {
    pub identity: IdentityKey,
    pub variant: Variant,
    /// Split of the target variant's video
    pub split: Split,
    /// Split of the authentic video
    pub authentic_split: Split,
    pub pairs: Vec<FramePair>,
    pub missing_authentic_count: u32,
    pub missing_target_count: u32,
}

impl PairManifest {
    /// Pair at `rank`, if both of its frames were present.
    pub fn pair_at(&self, rank: u32) -> Option<&FramePair> {
        self.pairs
            .binary_search_by_key(&rank, |p| p.rank)
            .ok()
            .map(|idx| &self.pairs[idx])
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
