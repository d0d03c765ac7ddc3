//! Object detection post-processor
//!
//! The detection algorithm itself is supplied by the caller through
//! [`ObjectDetector`]. This module checks frame geometry, applies the weight
//! threshold and writes every frame with a confident detection, boxes drawn,
//! to a separate low-rate detection video. Crops can be saved as well.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::Rgb;
use tracing::{debug, info, warn};

use crate::domain::model::Resolution;
use crate::error::{ConcatError, ConcatResult};
use crate::ports::{Frame, MediaBackend, SinkSettings, VideoSink};
use crate::postprocess::object_saver::ObjectSaver;
use crate::postprocess::FramePostProcessor;

/// Minimum weight for a detection to be kept
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.7;

/// Frame rate of the detection video
pub const DETECTION_VIDEO_FPS: f64 = 2.0;

/// Codec of the detection video
pub const DETECTION_VIDEO_CODEC: &str = "h264";

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 255]);

/// Axis-aligned detection box in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f32,
}

/// Detection algorithm plugged into [`DetectionPostProcessor`]
pub trait ObjectDetector {
    fn detect(&mut self, frame: &Frame) -> ConcatResult<Vec<Detection>>;
}

impl<D: ObjectDetector + ?Sized> ObjectDetector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> ConcatResult<Vec<Detection>> {
        (**self).detect(frame)
    }
}

/// Creates a detector for each task that asks for a detection video
pub type DetectorFactory = Box<dyn FnMut() -> ConcatResult<Box<dyn ObjectDetector>>>;

/// Runs a detector on every emitted frame and records confident hits
pub struct DetectionPostProcessor<D> {
    detector: D,
    backend: Rc<dyn MediaBackend>,
    output_path: PathBuf,
    codec: String,
    threshold: f32,
    saver: Option<ObjectSaver>,
    resolution: Option<Resolution>,
    sink: Option<Box<dyn VideoSink>>,
    frames_seen: u64,
    frames_written: u64,
}

impl<D: ObjectDetector> DetectionPostProcessor<D> {
    /// Write the detection video to `output_path` through `backend`
    pub fn new(
        detector: D,
        backend: Rc<dyn MediaBackend>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            detector,
            backend,
            output_path: output_path.into(),
            codec: DETECTION_VIDEO_CODEC.to_string(),
            threshold: DEFAULT_DETECTION_THRESHOLD,
            saver: None,
            resolution: None,
            sink: None,
            frames_seen: 0,
            frames_written: 0,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Also save a JPEG crop of every confident detection
    pub fn with_object_saver(mut self, saver: ObjectSaver) -> Self {
        self.saver = Some(saver);
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Frames written to the detection video during the current task
    pub fn written_count(&self) -> u64 {
        self.frames_written
    }

    pub fn saved_count(&self) -> u32 {
        self.saver.as_ref().map_or(0, ObjectSaver::saved_count)
    }

    fn failure(&self, message: String) -> ConcatError {
        ConcatError::PostProcessor {
            name: self.name().to_string(),
            message,
        }
    }

    fn release_sink(&mut self) -> ConcatResult<()> {
        match self.sink.take() {
            Some(mut sink) => sink.release(),
            None => Ok(()),
        }
    }
}

impl<D: ObjectDetector> FramePostProcessor for DetectionPostProcessor<D> {
    fn name(&self) -> &str {
        "object-detection"
    }

    fn begin(&mut self, resolution: Resolution) -> ConcatResult<()> {
        if let Err(e) = self.release_sink() {
            warn!("Failed to release previous detection video: {}", e);
        }
        if let Some(saver) = self.saver.as_mut() {
            fs::create_dir_all(saver.output_dir())?;
            saver.reset();
        }

        let settings = SinkSettings {
            path: self.output_path.clone(),
            codec: self.codec.clone(),
            fps: DETECTION_VIDEO_FPS,
            resolution,
        };
        self.sink = Some(self.backend.open_sink(&settings)?);
        self.resolution = Some(resolution);
        self.frames_seen = 0;
        self.frames_written = 0;
        info!(
            "Object detection started ({}, video {})",
            resolution,
            self.output_path.display()
        );
        Ok(())
    }

    fn process(&mut self, frame: &Frame) -> ConcatResult<()> {
        let expected = self
            .resolution
            .ok_or_else(|| self.failure("frame received before begin".to_string()))?;
        let (width, height) = frame.dimensions();
        if (width, height) != (expected.width, expected.height) {
            return Err(self.failure(format!(
                "frame size {}x{} does not match {}",
                width, height, expected
            )));
        }

        self.frames_seen += 1;
        let threshold = self.threshold;
        let detections: Vec<Detection> = self
            .detector
            .detect(frame)?
            .into_iter()
            .filter(|d| d.weight > threshold)
            .collect();
        if detections.is_empty() {
            return Ok(());
        }

        let mut annotated = frame.clone();
        for detection in &detections {
            draw_box(&mut annotated, detection, BOX_COLOR);
        }
        if self.sink.is_none() {
            return Err(self.failure("detection video is not open".to_string()));
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.write(&annotated)?;
        }
        self.frames_written += 1;
        debug!("Frame with {} detections written", detections.len());

        if let Some(saver) = self.saver.as_mut() {
            for detection in &detections {
                if let Some(path) = saver.save_object(frame, detection)? {
                    debug!("Saved detection crop {}", path.display());
                }
            }
        }
        Ok(())
    }

    fn end(&mut self) -> ConcatResult<()> {
        info!(
            "Object detection finished: {} of {} frames had detections",
            self.frames_written, self.frames_seen
        );
        self.resolution = None;
        self.release_sink()
    }
}

impl<D> Drop for DetectionPostProcessor<D> {
    fn drop(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.release() {
                warn!("Failed to release detection video: {}", e);
            }
        }
    }
}

/// Draw a one pixel outline of `detection`, clipped to the frame
pub fn draw_box(frame: &mut Frame, detection: &Detection, color: Rgb<u8>) {
    let (frame_width, frame_height) = frame.dimensions();
    if detection.width == 0 || detection.height == 0 {
        return;
    }
    if detection.x >= frame_width || detection.y >= frame_height {
        return;
    }
    let x1 = detection.x;
    let y1 = detection.y;
    let x2 = detection
        .x
        .saturating_add(detection.width - 1)
        .min(frame_width - 1);
    let y2 = detection
        .y
        .saturating_add(detection.height - 1)
        .min(frame_height - 1);

    for x in x1..=x2 {
        frame.put_pixel(x, y1, color);
        frame.put_pixel(x, y2, color);
    }
    for y in y1..=y2 {
        frame.put_pixel(x1, y, color);
        frame.put_pixel(x2, y, color);
    }
}
