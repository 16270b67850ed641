//! Face detection boundary.
//!
//! Detection itself runs outside this crate; implementations of
//! [`FaceDetector`] adapt whatever model produced the boxes.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::MediaResult;

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from corner coordinates.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }
}

/// One detected face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f64,
}

/// Face detection provider.
pub trait FaceDetector: Send + Sync {
    /// Detect faces in an RGB frame. An empty result means no face.
    fn detect(&self, frame: &RgbImage) -> MediaResult<Vec<Detection>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Highest-scoring detection, if any.
pub fn best_detection(detections: &[Detection]) -> Option<Detection> {
    detections
        .iter()
        .copied()
        .filter(|d| d.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score))
}
