//! Writes frame sequences back to playable video files.
//!
//! Raw frames are piped into an ffmpeg encoder over stdin. Used to dump the
//! extracted reference clips so a run's references can be reviewed by eye.

use crate::source::FrameSequence;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ringwatch_core::{FrameBuffer, FrameRate, Result, RingwatchError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Video codec for dumped clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipCodec {
    #[default]
    H264,
    Vp9,
}

impl ClipCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Vp9 => "libvpx-vp9",
        }
    }

    /// File extension for this codec.
    pub fn extension(self) -> &'static str {
        match self {
            Self::H264 => "mp4",
            Self::Vp9 => "webm",
        }
    }
}

/// Encodes frames into a single output file.
#[derive(Debug, Clone)]
pub struct ClipWriter {
    output_path: PathBuf,
    codec: ClipCodec,
    /// CRF value (0-51, lower = better).
    crf: u32,
}

impl ClipWriter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            codec: ClipCodec::H264,
            crf: 18,
        }
    }

    pub fn with_codec(mut self, codec: ClipCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf.min(51);
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Build the FFmpeg arguments for frames of the given size and rate.
    pub fn ffmpeg_args(&self, width: u32, height: u32, rate: FrameRate) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgb24".into(),
            "-video_size".into(),
            format!("{width}x{height}"),
            "-framerate".into(),
            format!("{}/{}", rate.numerator, rate.denominator),
            "-i".into(),
            "pipe:0".into(),
            "-c:v".into(),
            self.codec.ffmpeg_encoder().into(),
            "-crf".into(),
            self.crf.to_string(),
        ];
        if self.codec == ClipCodec::Vp9 {
            args.extend(["-b:v".into(), "0".into()]);
        }
        // yuv420p needs even dimensions
        args.extend([
            "-vf".into(),
            "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ]);
        args
    }

    /// Encode a whole sequence.
    pub fn write_sequence(&self, sequence: &FrameSequence) -> Result<()> {
        use crate::source::FrameSource;
        self.write(sequence.frames(), sequence.frame_rate())
    }

    /// Encode `frames` at `rate`. All frames must share the first frame's size.
    pub fn write(&self, frames: &[FrameBuffer], rate: FrameRate) -> Result<()> {
        let Some(first) = frames.first() else {
            return Err(RingwatchError::InvalidParameter(
                "Cannot write an empty clip".into(),
            ));
        };
        let (width, height) = (first.width, first.height);
        if let Some(bad) = frames.iter().find(|f| (f.width, f.height) != (width, height)) {
            return Err(RingwatchError::InvalidParameter(format!(
                "Clip frames must share one size: {}x{} vs {}x{}",
                width, height, bad.width, bad.height
            )));
        }

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!(
            "Encoding {} frames ({}x{}, {}) to {}",
            frames.len(),
            width,
            height,
            rate,
            self.output_path.display()
        );

        let mut child = FfmpegCommand::new()
            .hide_banner()
            .args(self.ffmpeg_args(width, height, rate))
            .output(self.output_path.to_string_lossy().as_ref())
            .overwrite()
            .spawn()
            .map_err(|e| RingwatchError::Encoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let mut stdin = child
            .take_stdin()
            .ok_or_else(|| RingwatchError::Encoder("Failed to open ffmpeg stdin".into()))?;

        let events = match child.iter() {
            Ok(events) => events,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RingwatchError::Encoder(e.to_string()));
            }
        };

        // stderr is drained on this thread while the writer feeds stdin
        let (write_result, errors) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || -> std::io::Result<()> {
                for frame in frames {
                    stdin.write_all(&frame.to_packed())?;
                }
                Ok(())
            });
            let errors: Vec<String> = events
                .filter_map(|event| match event {
                    FfmpegEvent::Error(message)
                    | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message) => Some(message),
                    _ => None,
                })
                .collect();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("clip writer thread panicked")));
            (written, errors)
        });

        let status = child
            .wait()
            .map_err(|e| RingwatchError::Encoder(format!("Failed to wait for ffmpeg: {e}")))?;

        if !status.success() {
            return Err(RingwatchError::Encoder(format!(
                "ffmpeg exited with status {}: {}",
                status,
                errors.join("; ")
            )));
        }
        write_result
            .map_err(|e| RingwatchError::Encoder(format!("Failed to write frame: {e}")))?;

        info!("Wrote {} frame clip to {}", frames.len(), self.output_path.display());
        Ok(())
    }
}
