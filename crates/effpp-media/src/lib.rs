//! Face crop extraction for aligned EFF++ frames.
//!
//! Video decoding and face detection are external collaborators reached
//! through [`FrameSource`] and [`FaceDetector`]. This crate owns crop
//! geometry, margin planning and the on-disk crop layout.

pub mod cropper;
pub mod detection;
pub mod error;
pub mod extract;
pub mod margin;
pub mod source;

pub use cropper::{square_window, CropBox, CropResult, FaceCropper, DEFAULT_FACE_SIZE};
pub use detection::{best_detection, BoundingBox, Detection, FaceDetector};
pub use error::{MediaError, MediaResult};
pub use extract::{extract_video_crops, CropMetadata, CropOutcome};
pub use margin::{MarginPlanner, DEFAULT_EVAL_MARGIN, DEFAULT_MARGIN_HIGH, DEFAULT_MARGIN_LOW};
pub use source::{FrameSource, ImageSequenceSource};
