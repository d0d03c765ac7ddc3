//! Forward-only decoder over the best video stream of a file

use std::path::Path;

use ffmpeg_next::format::{self, Pixel};
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::error::EAGAIN;
use ffmpeg_next::util::frame;
use ffmpeg_next::{codec, decoder, media, Packet};
use tracing::debug;

use crate::error::{ConcatError, ConcatResult};
use crate::ports::{Frame, VideoSource};

type ScalerKey = (Pixel, u32, u32);

pub struct FfmpegSource {
    input: format::context::Input,
    decoder: decoder::Video,
    stream_index: usize,
    decoded: frame::Video,
    pending: bool,
    input_drained: bool,
    scaler: Option<(ScalerKey, scaling::Context)>,
    released: bool,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> ConcatResult<Self> {
        let source_error = |message: String| ConcatError::Source {
            path: path.display().to_string(),
            message,
        };

        let input = format::input(&path).map_err(|e| source_error(e.to_string()))?;
        let stream = input
            .streams()
            .best(media::Type::Video)
            .ok_or_else(|| source_error("no video stream".to_string()))?;
        let stream_index = stream.index();

        let decoder = codec::context::Context::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|e| source_error(format!("cannot open decoder: {}", e)))?;

        debug!(
            "Opened {} ({}x{}, stream {})",
            path.display(),
            decoder.width(),
            decoder.height(),
            stream_index
        );

        Ok(Self {
            input,
            decoder,
            stream_index,
            decoded: frame::Video::empty(),
            pending: false,
            input_drained: false,
            scaler: None,
            released: false,
        })
    }

    fn next_packet(&mut self) -> Option<Packet> {
        let index = self.stream_index;
        self.input
            .packets()
            .find(|(stream, _)| stream.index() == index)
            .map(|(_, packet)| packet)
    }
}

impl VideoSource for FfmpegSource {
    fn grab(&mut self) -> bool {
        self.pending = false;
        if self.released {
            return false;
        }

        loop {
            match self.decoder.receive_frame(&mut self.decoded) {
                Ok(()) => {
                    self.pending = true;
                    return true;
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == EAGAIN => {}
                // decoder drained or the frame is damaged
                Err(_) => return false,
            }

            if self.input_drained {
                return false;
            }

            match self.next_packet() {
                Some(packet) => {
                    if self.decoder.send_packet(&packet).is_err() {
                        return false;
                    }
                }
                None => {
                    self.input_drained = true;
                    if self.decoder.send_eof().is_err() {
                        return false;
                    }
                }
            }
        }
    }

    fn retrieve(&mut self) -> Option<Frame> {
        if !self.pending {
            return None;
        }

        let key = (
            self.decoded.format(),
            self.decoded.width(),
            self.decoded.height(),
        );
        let (_, width, height) = key;
        if width == 0 || height == 0 {
            return None;
        }

        let stale = self.scaler.as_ref().map_or(true, |(cached, _)| *cached != key);
        if stale {
            let context = scaling::Context::get(
                key.0,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                scaling::Flags::BILINEAR,
            )
            .ok()?;
            self.scaler = Some((key, context));
        }

        let (_, scaler) = self.scaler.as_mut()?;
        let mut rgb = frame::Video::empty();
        scaler.run(&self.decoded, &mut rgb).ok()?;
        to_image(&rgb)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.pending = false;
            self.scaler = None;
        }
    }
}

/// Copy an RGB24 frame into an image, dropping row padding
fn to_image(rgb: &frame::Video) -> Option<Frame> {
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    let stride = rgb.stride(0);
    let row = width * 3;
    let data = rgb.data(0);

    let mut pixels = Vec::with_capacity(row * height);
    for y in 0..height {
        let start = y * stride;
        pixels.extend_from_slice(data.get(start..start + row)?);
    }
    Frame::from_raw(rgb.width(), rgb.height(), pixels)
}
