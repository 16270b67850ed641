//! Pair Manifest Builder.
//!
//! Resolves alignment offsets into concrete frame files. Construction only
//! reads the filesystem; it never creates or removes frames.

use std::path::{Path, PathBuf};

use effpp_models::{
    frame_file_name, AlignmentRecord, FramePair, IdentityKey, PairManifest, Split, Variant,
};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{AlignError, AlignResult};
use crate::metrics;

/// Default extension of extracted frames.
pub const DEFAULT_FRAME_EXT: &str = "jpg";

/// Where extracted frames live: `{root}/{split}/{variant}/{identity}/frame_<offset>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    pub root: PathBuf,
    pub ext: String,
}

impl FrameLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ext: DEFAULT_FRAME_EXT.to_string(),
        }
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = ext.into();
        self
    }

    /// Directory holding one video's frames.
    pub fn video_dir(&self, split: &Split, variant: Variant, identity: &IdentityKey) -> PathBuf {
        self.root
            .join(split.as_str())
            .join(variant.as_str())
            .join(identity.as_str())
    }

    /// Path of the cropped frame at `offset`.
    ///
    /// # Arguments
    /// * `split` - Split of the video
    /// * `variant` - Variant of the video
    /// * `identity` - Identity the video belongs to
    /// * `offset` - Frame offset within the video
    pub fn frame_path(
        &self,
        split: &Split,
        variant: Variant,
        identity: &IdentityKey,
        offset: u32,
    ) -> PathBuf {
        self.video_dir(split, variant, identity)
            .join(frame_file_name(offset, &self.ext))
    }
}

/// Resolve the pairs of one (identity, variant).
///
/// A rank is kept only when both its authentic and target frames exist.
/// For the authentic variant both sides are the same file and a missing
/// frame counts once, on the authentic side.
pub fn build_pairs(
    layout: &FrameLayout,
    record: &AlignmentRecord,
    variant: Variant,
) -> AlignResult<PairManifest> {
    let authentic = record.video(Variant::Real).ok_or_else(|| {
        AlignError::invalid_metadata(format!("{}: no authentic video", record.identity))
    })?;
    let target = record.video(variant).ok_or_else(|| {
        AlignError::invalid_metadata(format!("{}: no {} video", record.identity, variant))
    })?;

    let mut pairs = Vec::with_capacity(record.frame_count());
    let mut missing_authentic_count = 0u32;
    let mut missing_target_count = 0u32;

    for (rank, offset) in record.frame_offsets.iter().copied().enumerate() {
        let authentic_path =
            layout.frame_path(&authentic.split, Variant::Real, &record.identity, offset);
        let target_path = layout.frame_path(&target.split, variant, &record.identity, offset);

        let authentic_ok = authentic_path.is_file();
        let target_ok = if variant == Variant::Real {
            authentic_ok
        } else {
            target_path.is_file()
        };

        if !authentic_ok {
            missing_authentic_count += 1;
        }
        if !target_ok && variant != Variant::Real {
            missing_target_count += 1;
        }
        if authentic_ok && target_ok {
            pairs.push(FramePair {
                rank: rank as u32,
                offset,
                authentic_frame_path: authentic_path,
                target_frame_path: target_path,
            });
        }
    }

    debug!(
        identity = %record.identity,
        variant = %variant,
        pairs = pairs.len(),
        missing_authentic = missing_authentic_count,
        missing_target = missing_target_count,
        "Resolved pair manifest"
    );
    metrics::record_pairs(
        variant,
        pairs.len(),
        missing_authentic_count,
        missing_target_count,
    );

    Ok(PairManifest {
        identity: record.identity.clone(),
        variant,
        split: target.split.clone(),
        authentic_split: authentic.split.clone(),
        pairs,
        missing_authentic_count,
        missing_target_count,
    })
}

/// Resolve all five manifests of every record, in parallel across records.
///
/// Output order is by record, then canonical variant order.
pub fn build_all_pairs(
    layout: &FrameLayout,
    records: &[AlignmentRecord],
) -> AlignResult<Vec<PairManifest>> {
    let nested: Vec<Vec<PairManifest>> = records
        .par_iter()
        .map(|record| {
            Variant::ALL
                .iter()
                .map(|variant| build_pairs(layout, record, *variant))
                .collect::<AlignResult<Vec<_>>>()
        })
        .collect::<AlignResult<Vec<_>>>()?;
    Ok(nested.into_iter().flatten().collect())
}

/// Path of a persisted pair manifest: `{dir}/{split}/{variant}/{identity}.json`.
pub fn pair_manifest_path(
    dir: &Path,
    split: &Split,
    variant: Variant,
    identity: &IdentityKey,
) -> PathBuf {
    dir.join(split.as_str())
        .join(variant.as_str())
        .join(format!("{}.json", identity.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use effpp_models::VideoDescriptor;
    use std::collections::BTreeMap;

    fn record(splits: [&str; 5], offsets: Vec<u32>) -> AlignmentRecord {
        let videos: BTreeMap<Variant, VideoDescriptor> = Variant::ALL
            .iter()
            .enumerate()
            .map(|(i, v)| {
                (
                    *v,
                    VideoDescriptor {
                        variant: *v,
                        video_id: format!("000_{}", i),
                        path: String::new(),
                        split: Split::from(splits[i]),
                        frame_count: 100,
                    },
                )
            })
            .collect();
        AlignmentRecord {
            identity: IdentityKey::from("000"),
            primary_split: Split::from(splits[0]),
            min_length: 100,
            frame_offsets: offsets,
            split_consistent: true,
            split_histogram: BTreeMap::new(),
            videos,
        }
    }

    fn touch(layout: &FrameLayout, split: &str, variant: Variant, offset: u32) {
        let path =
            layout.frame_path(&Split::from(split), variant, &IdentityKey::from("000"), offset);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_frame_path_layout() {
        let layout = FrameLayout::new("/data/crops").with_ext("png");
        let identity = IdentityKey::from("042");
        let path = layout.frame_path(&Split::from("val"), Variant::Face2Face, &identity, 9);
        assert_eq!(path, PathBuf::from("/data/crops/val/Face2Face/042/frame_0009.png"));
    }

    #[test]
    fn test_missing_sides_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FrameLayout::new(dir.path());
        let record = record(["train", "train", "train", "test", "train"], vec![0, 5, 10]);

        for offset in [0, 5] {
            touch(&layout, "train", Variant::Real, offset);
        }
        for offset in [0, 10] {
            touch(&layout, "test", Variant::FaceSwap, offset);
        }

        let manifest = build_pairs(&layout, &record, Variant::FaceSwap).unwrap();
        assert_eq!(manifest.split.as_str(), "test");
        assert_eq!(manifest.authentic_split.as_str(), "train");
        assert_eq!(manifest.pairs.len(), 1);
        assert_eq!(manifest.pairs[0].rank, 0);
        assert_eq!(manifest.missing_authentic_count, 1);
        assert_eq!(manifest.missing_target_count, 1);

        let real = build_pairs(&layout, &record, Variant::Real).unwrap();
        assert_eq!(real.pairs.len(), 2);
        assert_eq!(real.missing_authentic_count, 1);
        assert_eq!(real.missing_target_count, 0);
        assert_eq!(real.pairs[1].authentic_frame_path, real.pairs[1].target_frame_path);
    }

    #[test]
    fn test_build_all_pairs_order() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FrameLayout::new(dir.path());
        let records = vec![record(["train"; 5], vec![0, 1])];
        let manifests = build_all_pairs(&layout, &records).unwrap();
        let variants: Vec<Variant> = manifests.iter().map(|m| m.variant).collect();
        assert_eq!(variants, Variant::ALL.to_vec());
        assert!(manifests.iter().all(|m| m.pairs.is_empty()));
    }

    #[test]
    fn test_manifest_path() {
        let path = pair_manifest_path(
            Path::new("out"),
            &Split::from("train"),
            Variant::NeuralTextures,
            &IdentityKey::from("007"),
        );
        assert_eq!(path, PathBuf::from("out/train/NeuralTextures/007.json"));
    }
}
