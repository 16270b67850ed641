//! Square face crops with a margin around the best detection.

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::detection::{best_detection, FaceDetector};
use crate::error::MediaResult;

/// Default output side length in pixels.
pub const DEFAULT_FACE_SIZE: u32 = 224;

/// Crop window in frame pixels, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn as_array(&self) -> [u32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

/// A cropped face and the box it came from.
#[derive(Debug, Clone)]
pub struct CropResult {
    pub image: RgbImage,
    pub bbox: CropBox,
    pub detection_score: f64,
}

/// Square window of side `ceil(max(w, h) * (1 + margin))` centred on the
/// box, clamped to the frame.
pub fn square_window(
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    margin_ratio: f64,
    frame_width: u32,
    frame_height: u32,
) -> CropBox {
    let (x1, y1, x2, y2) = (x1.trunc(), y1.trunc(), x2.trunc(), y2.trunc());
    let cx = (x1 + x2) / 2.0;
    let cy = (y1 + y2) / 2.0;
    let base = (x2 - x1).max(y2 - y1).max(0.0);
    let size = (base * (1.0 + margin_ratio)).ceil();

    let left = (cx - size / 2.0).trunc().max(0.0);
    let top = (cy - size / 2.0).trunc().max(0.0);
    let right = (left + size).min(f64::from(frame_width));
    let bottom = (top + size).min(f64::from(frame_height));

    let left = left.min(f64::from(frame_width)) as u32;
    let top = top.min(f64::from(frame_height)) as u32;
    CropBox {
        left,
        top,
        right: (right.max(0.0) as u32).max(left),
        bottom: (bottom.max(0.0) as u32).max(top),
    }
}

/// Detector plus crop geometry.
pub struct FaceCropper<D: FaceDetector> {
    detector: D,
    face_size: u32,
}

impl<D: FaceDetector> FaceCropper<D> {
    /// Cropper with the default face size.
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            face_size: DEFAULT_FACE_SIZE,
        }
    }

    pub fn with_face_size(mut self, face_size: u32) -> Self {
        self.face_size = face_size;
        self
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Crop the best face in `frame`.
    ///
    /// Returns `None` when nothing is detected or the window is empty.
    pub fn crop(&self, frame: &RgbImage, margin_ratio: f64) -> MediaResult<Option<CropResult>> {
        let detections = self.detector.detect(frame)?;
        let Some(face) = best_detection(&detections) else {
            return Ok(None);
        };

        let window = square_window(
            face.bbox.x,
            face.bbox.y,
            face.bbox.x2(),
            face.bbox.y2(),
            margin_ratio,
            frame.width(),
            frame.height(),
        );
        if window.is_empty() {
            return Ok(None);
        }

        let cropped =
            imageops::crop_imm(frame, window.left, window.top, window.width(), window.height())
                .to_image();
        let image = imageops::resize(
            &cropped,
            self.face_size,
            self.face_size,
            FilterType::Triangle,
        );

        Ok(Some(CropResult {
            image,
            bbox: window,
            detection_score: face.score,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BoundingBox, Detection};

    struct StaticDetector(Vec<Detection>);

    impl FaceDetector for StaticDetector {
        fn detect(&self, _frame: &RgbImage) -> MediaResult<Vec<Detection>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    #[test]
    fn test_window_centred_with_margin() {
        let window = square_window(100.0, 100.0, 200.0, 180.0, 0.2, 640, 480);
        // side = ceil(100 * 1.2) = 120 around (150, 140)
        assert_eq!(window, CropBox { left: 90, top: 80, right: 210, bottom: 200 });
    }

    #[test]
    fn test_window_clamped_at_edges() {
        let window = square_window(0.0, 0.0, 50.0, 50.0, 0.5, 60, 40);
        assert_eq!(window.left, 0);
        assert_eq!(window.top, 0);
        assert_eq!(window.right, 60);
        assert_eq!(window.bottom, 40);
    }

    #[test]
    fn test_window_outside_frame_is_empty() {
        let window = square_window(500.0, 500.0, 520.0, 520.0, 0.1, 100, 100);
        assert!(window.is_empty());
    }

    #[test]
    fn test_crop_resizes_best_face() {
        let frame = RgbImage::new(320, 240);
        let cropper = FaceCropper::new(StaticDetector(vec![
            Detection { bbox: BoundingBox::from_corners(10.0, 10.0, 30.0, 30.0), score: 0.3 },
            Detection { bbox: BoundingBox::from_corners(100.0, 60.0, 180.0, 140.0), score: 0.95 },
        ]))
        .with_face_size(64);

        let result = cropper.crop(&frame, 0.125).unwrap().unwrap();
        assert_eq!(result.image.dimensions(), (64, 64));
        assert_eq!(result.detection_score, 0.95);
        assert_eq!(result.bbox.width(), 90);
    }

    #[test]
    fn test_crop_without_faces_is_none() {
        let frame = RgbImage::new(64, 64);
        let cropper = FaceCropper::new(StaticDetector(Vec::new()));
        assert!(cropper.crop(&frame, 0.1).unwrap().is_none());
    }
}
