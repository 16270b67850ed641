//! Crop extraction for one (identity, variant).
//!
//! Writes `frame_<offset>.<ext>` plus a `frame_<offset>.json` sidecar into
//! the directory the pair manifest builder resolves against.

use effpp_align::FrameLayout;
use effpp_models::{AlignmentRecord, IdentityKey, Split, Variant};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cropper::FaceCropper;
use crate::detection::FaceDetector;
use crate::error::{MediaError, MediaResult};
use crate::margin::MarginPlanner;
use crate::source::FrameSource;

/// Sidecar written next to every crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropMetadata {
    pub identity: IdentityKey,
    pub variant: Variant,
    pub split: Split,
    pub rank: u32,
    pub offset: u32,
    pub margin_ratio: f64,
    /// `[left, top, right, bottom]` in source pixels
    pub bbox: [u32; 4],
    pub detection_score: f64,
    pub video_id: String,
    pub video_path: String,
}

/// Counters for one crop pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropOutcome {
    pub processed: usize,
    /// Offsets with no frame or no usable face
    pub failures: Vec<u32>,
}

/// Crop every aligned frame of `variant`.
///
/// Unreadable frames and frames without a face are recorded as failures
/// and skipped.
pub fn extract_video_crops<D: FaceDetector>(
    source: &mut dyn FrameSource,
    cropper: &FaceCropper<D>,
    planner: &mut MarginPlanner,
    record: &AlignmentRecord,
    variant: Variant,
    layout: &FrameLayout,
    max_frames: Option<usize>,
) -> MediaResult<CropOutcome> {
    let video = record.video(variant).ok_or_else(|| {
        MediaError::internal(format!("{} has no {} video", record.identity, variant))
    })?;
    let output_dir = layout.video_dir(&video.split, variant, &record.identity);
    std::fs::create_dir_all(&output_dir)?;

    let limit = max_frames.unwrap_or(usize::MAX);
    let mut outcome = CropOutcome::default();

    for (rank, offset) in record.frame_offsets.iter().copied().enumerate().take(limit) {
        let rank = rank as u32;
        let Some(frame) = source.read_frame(offset)? else {
            debug!(identity = %record.identity, variant = %variant, offset, "Frame unavailable");
            outcome.failures.push(offset);
            continue;
        };

        let margin_ratio = planner.margin(&record.identity, rank);
        let Some(crop) = cropper.crop(&frame, margin_ratio)? else {
            debug!(identity = %record.identity, variant = %variant, offset, "No face detected");
            outcome.failures.push(offset);
            continue;
        };

        let image_path = layout.frame_path(&video.split, variant, &record.identity, offset);
        crop.image.save(&image_path)?;

        let metadata = CropMetadata {
            identity: record.identity.clone(),
            variant,
            split: video.split.clone(),
            rank,
            offset,
            margin_ratio,
            bbox: crop.bbox.as_array(),
            detection_score: crop.detection_score,
            video_id: video.video_id.clone(),
            video_path: video.path.replace('\\', "/"),
        };
        let sidecar = image_path.with_extension("json");
        std::fs::write(&sidecar, serde_json::to_string_pretty(&metadata)?)?;
        outcome.processed += 1;
    }

    counter!("effpp_crops_written_total", "variant" => variant.as_str())
        .increment(outcome.processed as u64);
    if !outcome.failures.is_empty() {
        counter!("effpp_crop_failures_total", "variant" => variant.as_str())
            .increment(outcome.failures.len() as u64);
        warn!(
            identity = %record.identity,
            variant = %variant,
            failures = outcome.failures.len(),
            detector = cropper.detector_name(),
            "Some frames produced no crop"
        );
    }
    info!(
        identity = %record.identity,
        variant = %variant,
        processed = outcome.processed,
        "Crops extracted"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BoundingBox, Detection};
    use crate::margin::DEFAULT_EVAL_MARGIN;
    use effpp_models::VideoDescriptor;
    use image::RgbImage;
    use std::collections::{BTreeMap, HashMap};

    struct MemorySource(HashMap<u32, RgbImage>);

    impl FrameSource for MemorySource {
        fn read_frame(&mut self, offset: u32) -> MediaResult<Option<RgbImage>> {
            Ok(self.0.get(&offset).cloned())
        }
    }

    /// Finds a face only in frames wider than 40 pixels.
    struct WideFrameDetector;

    impl FaceDetector for WideFrameDetector {
        fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>> {
            if frame.width() <= 40 {
                return Ok(Vec::new());
            }
            Ok(vec![Detection {
                bbox: BoundingBox::new(10.0, 10.0, 20.0, 20.0),
                score: 0.8,
            }])
        }

        fn name(&self) -> &'static str {
            "wide"
        }
    }

    fn record() -> AlignmentRecord {
        let videos: BTreeMap<Variant, VideoDescriptor> = Variant::ALL
            .iter()
            .map(|v| {
                (
                    *v,
                    VideoDescriptor {
                        variant: *v,
                        video_id: "000".to_string(),
                        path: format!("videos\\{}\\000.mp4", v),
                        split: Split::from("test"),
                        frame_count: 30,
                    },
                )
            })
            .collect();
        AlignmentRecord {
            identity: IdentityKey::from("000"),
            primary_split: Split::from("test"),
            min_length: 30,
            frame_offsets: vec![0, 10, 20, 29],
            split_consistent: true,
            split_histogram: BTreeMap::new(),
            videos,
        }
    }

    #[test]
    fn test_extract_writes_crops_and_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FrameLayout::new(dir.path());
        let mut frames = HashMap::new();
        frames.insert(0, RgbImage::new(64, 64));
        frames.insert(10, RgbImage::new(32, 32));
        frames.insert(20, RgbImage::new(64, 64));
        let mut source = MemorySource(frames);

        let cropper = FaceCropper::new(WideFrameDetector).with_face_size(16);
        let mut planner = MarginPlanner::eval(DEFAULT_EVAL_MARGIN);
        let record = record();

        let outcome = extract_video_crops(
            &mut source,
            &cropper,
            &mut planner,
            &record,
            Variant::Face2Face,
            &layout,
            None,
        )
        .unwrap();

        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.failures, vec![10, 29]);

        let image_path =
            layout.frame_path(&Split::from("test"), Variant::Face2Face, &record.identity, 20);
        assert!(image_path.is_file());
        let sidecar: CropMetadata = serde_json::from_str(
            &std::fs::read_to_string(image_path.with_extension("json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar.rank, 2);
        assert_eq!(sidecar.offset, 20);
        assert_eq!(sidecar.margin_ratio, 0.125);
        assert_eq!(sidecar.video_path, "videos/Face2Face/000.mp4");
    }

    #[test]
    fn test_extract_respects_max_frames() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FrameLayout::new(dir.path());
        let frames = [0, 10, 20, 29]
            .into_iter()
            .map(|o| (o, RgbImage::new(64, 64)))
            .collect();
        let mut source = MemorySource(frames);
        let cropper = FaceCropper::new(WideFrameDetector);
        let mut planner = MarginPlanner::training(0.04, 0.2, 1).unwrap();

        let outcome = extract_video_crops(
            &mut source,
            &cropper,
            &mut planner,
            &record(),
            Variant::Real,
            &layout,
            Some(2),
        )
        .unwrap();
        assert_eq!(outcome.processed, 2);
        assert!(outcome.failures.is_empty());
    }
}
