//! Identity families.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::variant::Variant;
use crate::video::{IdentityKey, Split, VideoDescriptor};

/// Why an identity was excluded before or during alignment.
///
/// Rejections are counted, never raised.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
/// Why an identity was left out of alignment.
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// A required variant has no metadata entry.
    MissingVariant,
    /// More than one metadata entry for the same variant.
    DuplicateVariant,
    /// The variant's video has no row in its frame count table.
    MissingFrameCount,
    /// The shortest variant has no frames.
    ZeroLength,
    /// Variants come from different splits and consistency is required.
    SplitInconsistent,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingVariant => "missing_variant",
            RejectReason::DuplicateVariant => "duplicate_variant",
            RejectReason::MissingFrameCount => "missing_frame_count",
            RejectReason::ZeroLength => "zero_length",
            RejectReason::SplitInconsistent => "split_inconsistent",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// All five videos of one identity. Read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IdentityFamily {
    pub identity: IdentityKey,
    pub videos: BTreeMap<Variant, VideoDescriptor>,
}

impl IdentityFamily {
    /// Build a family, rejecting it unless every required variant is present.
    pub fn new(
        identity: IdentityKey,
        videos: BTreeMap<Variant, VideoDescriptor>,
    ) -> Result<Self, RejectReason> {
        if Variant::ALL.iter().any(|v| !videos.contains_key(v)) {
            return Err(RejectReason::MissingVariant);
        }
        Ok(Self { identity, videos })
    }

    /// Frame count of the shortest variant.
    pub fn min_length(&self) -> u32 {
        self.videos
            .values()
            .map(|v| v.frame_count)
            .min()
            .unwrap_or(0)
    }

    /// Split of the authentic video, used as the identity's primary split.
    pub fn primary_split(&self) -> Option<&Split> {
        self.videos.get(&Variant::Real).map(|v| &v.split)
    }

    /// True when all variants come from the same split.
    pub fn split_consistent(&self) -> bool {
        let mut splits = self.videos.values().map(|v| &v.split);
        match splits.next() {
            Some(first) => splits.all(|s| s == first),
            None => true,
        }
    }

    /// Number of variants per split.
    pub fn split_histogram(&self) -> BTreeMap<String, u32> {
        let mut histogram = BTreeMap::new();
        for video in self.videos.values() {
            *histogram.entry(video.split.0.clone()).or_insert(0) += 1;
        }
        histogram
    }

    pub fn video(&self, variant: Variant) -> Option<&VideoDescriptor> {
        self.videos.get(&variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(variant: Variant, split: &str, frames: u32) -> VideoDescriptor {
        VideoDescriptor {
            variant,
            video_id: format!("000_{}", variant),
            path: format!("videos/{}/000.mp4", variant),
            split: Split::from(split),
            frame_count: frames,
        }
    }

    fn full_videos() -> BTreeMap<Variant, VideoDescriptor> {
        Variant::ALL
            .iter()
            .map(|v| (*v, descriptor(*v, "train", 100)))
            .collect()
    }

    #[test]
    fn test_complete_family_accepted() {
        let family = IdentityFamily::new(IdentityKey::from("000"), full_videos()).unwrap();
        assert_eq!(family.min_length(), 100);
        assert!(family.split_consistent());
        assert_eq!(family.primary_split().unwrap().as_str(), "train");
    }

    #[test]
    fn test_missing_variant_rejected() {
        let mut videos = full_videos();
        videos.remove(&Variant::Face2Face);
        let result = IdentityFamily::new(IdentityKey::from("000"), videos);
        assert_eq!(result.unwrap_err(), RejectReason::MissingVariant);
    }

    #[test]
    fn test_split_histogram_and_consistency() {
        let mut videos = full_videos();
        videos.insert(Variant::FaceSwap, descriptor(Variant::FaceSwap, "val", 80));
        let family = IdentityFamily::new(IdentityKey::from("000"), videos).unwrap();
        assert!(!family.split_consistent());
        assert_eq!(family.min_length(), 80);
        let histogram = family.split_histogram();
        assert_eq!(histogram.get("train"), Some(&4));
        assert_eq!(histogram.get("val"), Some(&1));
    }
}
