//! Decoded frame sources.

use std::path::{Path, PathBuf};

use effpp_models::frame_file_name;
use image::RgbImage;

use crate::error::{MediaError, MediaResult};

/// Random access to a video's decoded frames.
pub trait FrameSource {
    /// Frame at `offset`, `None` when the video has no such frame.
    fn read_frame(&mut self, offset: u32) -> MediaResult<Option<RgbImage>>;
}

/// Full frames already decoded to `frame_<offset>.<ext>` image files.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    ext: String,
}

impl ImageSequenceSource {
    /// Open a directory of extracted frames.
    ///
    /// # Arguments
    /// * `dir` - Directory holding one image per frame
    /// * `ext` - Image extension, without the dot
    pub fn open(dir: impl Into<PathBuf>, ext: impl Into<String>) -> MediaResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(MediaError::SourceUnavailable(dir));
        }
        Ok(Self {
            dir,
            ext: ext.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self, offset: u32) -> MediaResult<Option<RgbImage>> {
        let path = self.dir.join(frame_file_name(offset, &self.ext));
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(image::open(&path)?.to_rgb8()))
    }
}
