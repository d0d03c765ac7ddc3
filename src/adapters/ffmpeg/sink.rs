//! Encoder and muxer for the concatenated output

use std::path::{Path, PathBuf};

use ffmpeg_next::codec::{self, Id};
use ffmpeg_next::format::{self, Pixel};
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame;
use ffmpeg_next::{encoder, Codec, Packet, Rational};
use tracing::{debug, warn};

use crate::domain::model::Resolution;
use crate::error::{ConcatError, ConcatResult};
use crate::ports::{Frame, SinkSettings, VideoSink};

pub struct FfmpegSink {
    path: PathBuf,
    output: format::context::Output,
    encoder: encoder::Video,
    scaler: scaling::Context,
    resolution: Resolution,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    next_pts: i64,
    finished: bool,
}

impl FfmpegSink {
    pub fn open(settings: &SinkSettings) -> ConcatResult<Self> {
        let path = settings.path.as_path();
        let Resolution { width, height } = settings.resolution;

        let mut output = format::output(&path).map_err(|e| sink_error(path, e))?;
        let codec = find_encoder(&settings.codec).ok_or_else(|| {
            sink_error(path, format!("no encoder for codec '{}'", settings.codec))
        })?;
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        let mut stream = output.add_stream(codec).map_err(|e| sink_error(path, e))?;
        let stream_index = stream.index();

        let mut encoder = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| sink_error(path, e))?;
        let time_base = Rational::from(settings.fps).invert();
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(Pixel::YUV420P);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(Rational::from(settings.fps)));
        if global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder.open_as(codec).map_err(|e| sink_error(path, e))?;
        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);

        output.write_header().map_err(|e| sink_error(path, e))?;
        let stream_time_base = output
            .stream(stream_index)
            .map(|s| s.time_base())
            .unwrap_or(time_base);

        let scaler = scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| sink_error(path, e))?;

        debug!(
            "Opened {} ({} {} @ {} fps)",
            path.display(),
            codec.name(),
            settings.resolution,
            settings.fps
        );

        Ok(Self {
            path: settings.path.clone(),
            output,
            encoder,
            scaler,
            resolution: settings.resolution,
            stream_index,
            encoder_time_base: time_base,
            stream_time_base,
            next_pts: 0,
            finished: false,
        })
    }

    fn drain_packets(&mut self) -> ConcatResult<()> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| sink_error(&self.path, e))?;
        }
        Ok(())
    }
}

impl VideoSink for FfmpegSink {
    fn write(&mut self, image: &Frame) -> ConcatResult<()> {
        if self.finished {
            return Err(sink_error(&self.path, "write after release"));
        }
        let (width, height) = image.dimensions();
        if (width, height) != (self.resolution.width, self.resolution.height) {
            return Err(sink_error(
                &self.path,
                format!("frame is {}x{}, expected {}", width, height, self.resolution),
            ));
        }

        let mut rgb = frame::Video::new(Pixel::RGB24, width, height);
        let stride = rgb.stride(0);
        let row = width as usize * 3;
        let data = rgb.data_mut(0);
        for (y, line) in image.as_raw().chunks_exact(row).enumerate() {
            let start = y * stride;
            data[start..start + row].copy_from_slice(line);
        }

        let mut yuv = frame::Video::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .map_err(|e| sink_error(&self.path, e))?;
        yuv.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&yuv)
            .map_err(|e| sink_error(&self.path, e))?;
        self.drain_packets()
    }

    fn release(&mut self) -> ConcatResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        self.encoder
            .send_eof()
            .map_err(|e| sink_error(&self.path, e))?;
        self.drain_packets()?;
        self.output
            .write_trailer()
            .map_err(|e| sink_error(&self.path, e))?;
        debug!("Closed {} after {} frames", self.path.display(), self.next_pts);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("{}", e);
        }
    }
}

/// Encoder by name, with id fallbacks for the common aliases
fn find_encoder(name: &str) -> Option<Codec> {
    encoder::find_by_name(name).or_else(|| {
        let id = match name.to_ascii_lowercase().as_str() {
            "h264" | "avc" | "x264" => Id::H264,
            "hevc" | "h265" | "x265" => Id::HEVC,
            "mpeg4" | "mp4v" => Id::MPEG4,
            _ => return None,
        };
        encoder::find(id)
    })
}

fn sink_error(path: &Path, error: impl ToString) -> ConcatError {
    ConcatError::Sink {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
