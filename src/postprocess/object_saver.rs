//! Saves detected objects as JPEG crops

use std::path::{Path, PathBuf};

use image::imageops;

use crate::error::ConcatResult;
use crate::ports::Frame;
use crate::postprocess::detection::Detection;

/// Writes `obj_{weight%}_{n}.jpeg` crops into one directory
#[derive(Debug, Clone)]
pub struct ObjectSaver {
    output_dir: PathBuf,
    saved: u32,
}

impl ObjectSaver {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            saved: 0,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of crops written since the last reset
    pub fn saved_count(&self) -> u32 {
        self.saved
    }

    /// Restart crop numbering
    pub fn reset(&mut self) {
        self.saved = 0;
    }

    /// File name used for the `n`-th crop of a detection with `weight`
    pub fn crop_file_name(weight: f32, n: u32) -> String {
        format!("obj_{:.0}_{}.jpeg", weight * 100.0, n)
    }

    /// Crop the detection out of `frame` and save it.
    ///
    /// The box is clamped to the frame; a box with no overlap is skipped and
    /// `None` is returned.
    pub fn save_object(
        &mut self,
        frame: &Frame,
        detection: &Detection,
    ) -> ConcatResult<Option<PathBuf>> {
        let (frame_width, frame_height) = frame.dimensions();
        let x1 = detection.x.min(frame_width);
        let y1 = detection.y.min(frame_height);
        let x2 = detection.x.saturating_add(detection.width).min(frame_width);
        let y2 = detection.y.saturating_add(detection.height).min(frame_height);
        if x2 <= x1 || y2 <= y1 {
            return Ok(None);
        }

        let crop = imageops::crop_imm(frame, x1, y1, x2 - x1, y2 - y1).to_image();
        self.saved += 1;
        let path = self
            .output_dir
            .join(Self::crop_file_name(detection.weight, self.saved));
        crop.save(&path)?;
        Ok(Some(path))
    }
}
