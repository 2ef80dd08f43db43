//! Video decoder using FFmpeg via ffmpeg-sidecar.
//!
//! Every read spawns one ffmpeg process that seeks to the first requested
//! frame, scales to the analysis resolution and streams raw pixels back over
//! stdout. The process is killed when the read returns, even on error.

use crate::probe::MediaProbe;
use crate::source::FrameSource;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ringwatch_core::frame_budget::{
    estimate_bulk_bytes, BULK_READ_WARN_BYTES, DEFAULT_DECODE_HEIGHT, DEFAULT_DECODE_WIDTH,
};
use ringwatch_core::{FrameBuffer, FrameRate, PixelFormat, Result, RingwatchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Output geometry for decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_DECODE_WIDTH,
            height: DEFAULT_DECODE_HEIGHT,
            pixel_format: PixelFormat::Rgb8,
        }
    }
}

impl DecodeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RingwatchError::InvalidParameter(format!(
                "Decode size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Kills and reaps the ffmpeg process when dropped.
struct ChildGuard(FfmpegChild);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// A video file opened for random-access frame reads.
pub struct VideoDecoder {
    path: PathBuf,
    options: DecodeOptions,
    frame_rate: FrameRate,
    frame_count: usize,
    source_dimensions: (u32, u32),
}

impl VideoDecoder {
    /// Open a video file for decoding.
    pub fn open<P: AsRef<Path>>(path: P, options: DecodeOptions) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref();
        let probe = MediaProbe::probe(path).map_err(|e| {
            RingwatchError::Decoder(format!("Cannot open {}: {e}", path.display()))
        })?;
        let video = probe.primary_video().ok_or_else(|| {
            RingwatchError::Decoder(format!("No video stream in {}", path.display()))
        })?;
        let frame_count = probe.frame_count().unwrap_or(0);

        info!(
            "Opened {} ({}x{} {}, {}, {} frames)",
            path.display(),
            video.width,
            video.height,
            video.codec,
            video.frame_rate,
            frame_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            options,
            frame_rate: video.frame_rate,
            frame_count,
            source_dimensions: (video.width, video.height),
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dimensions of the stored video, before scaling.
    pub fn source_dimensions(&self) -> (u32, u32) {
        self.source_dimensions
    }

    /// Dimensions of decoded frames.
    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.options.width, self.options.height)
    }

    /// Video duration in seconds, derived from the frame count.
    pub fn duration_secs(&self) -> f64 {
        self.frame_count as f64 / self.frame_rate.to_fps_f64()
    }

    /// Seek position for a frame, backed off half a frame so the target
    /// frame's timestamp is not rounded past.
    fn seek_seconds(&self, frame: usize) -> f64 {
        ((frame as f64 - 0.5) / self.frame_rate.to_fps_f64()).max(0.0)
    }

    fn build_command(&self, start: usize, count: Option<usize>) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new();
        cmd.hide_banner();
        if start > 0 {
            cmd.args(["-ss", format!("{:.6}", self.seek_seconds(start)).as_str()]);
        }
        cmd.input(self.path.to_string_lossy().as_ref());
        cmd.args(["-an", "-sn"]);
        if let Some(count) = count {
            cmd.args(["-frames:v", count.to_string().as_str()]);
        }
        let scale = format!("scale={}:{}", self.options.width, self.options.height);
        cmd.args([
            "-vf",
            scale.as_str(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            self.options.pixel_format.ffmpeg_name(),
        ]);
        cmd.output("-");
        cmd
    }
}

impl FrameSource for VideoDecoder {
    fn len(&self) -> usize {
        self.frame_count
    }

    fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    fn read_range(&mut self, start: usize, end: Option<usize>) -> Result<Vec<FrameBuffer>> {
        let count = match end {
            Some(end) if end < start => {
                return Err(RingwatchError::InvalidParameter(format!(
                    "Frame range {start}..{end} is inverted"
                )));
            }
            Some(end) => Some(end - start),
            None => None,
        };
        if count == Some(0) {
            return Ok(Vec::new());
        }

        let expected = count.unwrap_or_else(|| self.frame_count.saturating_sub(start));
        let (width, height) = self.output_dimensions();
        let bytes = estimate_bulk_bytes(expected, width, height, self.options.pixel_format);
        if bytes > BULK_READ_WARN_BYTES {
            warn!(
                "Reading {} frames will hold ~{} MB of pixels in memory",
                expected,
                bytes / (1024 * 1024)
            );
        }

        debug!("Decoding frames {}..{:?} from {}", start, end, self.path.display());

        let child = self
            .build_command(start, count)
            .spawn()
            .map_err(|e| RingwatchError::Decoder(format!("Failed to spawn ffmpeg: {e}")))?;
        let mut guard = ChildGuard(child);
        let events = guard
            .0
            .iter()
            .map_err(|e| RingwatchError::Decoder(e.to_string()))?;

        let mut frames = Vec::with_capacity(expected.min(1 << 16));
        let mut errors = Vec::new();
        for event in events {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    if (frame.width, frame.height) != (width, height) {
                        return Err(RingwatchError::Decoder(format!(
                            "ffmpeg produced {}x{} frames, expected {}x{}",
                            frame.width, frame.height, width, height
                        )));
                    }
                    frames.push(FrameBuffer::from_packed(
                        frame.width,
                        frame.height,
                        self.options.pixel_format,
                        &frame.data,
                    )?);
                    if count.is_some_and(|c| frames.len() >= c) {
                        break;
                    }
                }
                FfmpegEvent::Error(message) | FfmpegEvent::Log(LogLevel::Error, message) => {
                    trace!("ffmpeg: {}", message);
                    errors.push(message);
                }
                FfmpegEvent::Log(LogLevel::Fatal, message) => {
                    return Err(RingwatchError::Decoder(message));
                }
                _ => {}
            }
        }

        if frames.is_empty() && !errors.is_empty() {
            return Err(RingwatchError::Decoder(errors.join("; ")));
        }
        if frames.len() < expected {
            debug!(
                "Decoded {} of {} requested frames from {}",
                frames.len(),
                expected,
                self.path.display()
            );
        }
        Ok(frames)
    }
}
