//! Media file probing to get metadata without full decode.

use ringwatch_core::{FrameRate, RationalTime, Result, RingwatchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProbe {
    /// File path
    pub path: String,
    /// Container duration
    pub duration: RationalTime,
    /// Video streams
    pub video_streams: Vec<VideoStreamInfo>,
    /// Container format
    pub format: String,
}

/// Information about a video stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub index: usize,
    pub codec: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub pixel_format: String,
    /// Frame count from the container header, when the muxer records it.
    pub frame_count: Option<usize>,
}

impl MediaProbe {
    /// Probe a media file with ffprobe.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.exists() {
            return Err(RingwatchError::NotFound(format!(
                "File not found: {}",
                path_str
            )));
        }

        debug!("Probing {}", path_str);

        let output = Command::new(ffmpeg_sidecar::ffprobe::ffprobe_path())
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| RingwatchError::Media(format!("Failed to execute ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(RingwatchError::Media(format!(
                "ffprobe failed on {}: {}",
                path_str,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Self::from_json(path_str, &String::from_utf8_lossy(&output.stdout))
    }

    /// Build a probe result from ffprobe's `-print_format json` output.
    pub fn from_json(path: impl Into<String>, json: &str) -> Result<Self> {
        let raw: FfprobeOutput = serde_json::from_str(json)
            .map_err(|e| RingwatchError::Serialization(format!("ffprobe output: {e}")))?;

        let duration = raw
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .map(RationalTime::from_seconds_f64)
            .unwrap_or_default();

        let mut video_streams = Vec::new();
        for stream in raw.streams.iter().filter(|s| s.codec_type.as_deref() == Some("video")) {
            // avg_frame_rate is 0/0 for some containers, fall back to r_frame_rate
            let frame_rate = [&stream.avg_frame_rate, &stream.r_frame_rate]
                .into_iter()
                .flatten()
                .find_map(|r| r.parse::<FrameRate>().ok())
                .ok_or_else(|| {
                    RingwatchError::UnsupportedFormat(format!(
                        "Video stream {} has no usable frame rate",
                        stream.index
                    ))
                })?;
            video_streams.push(VideoStreamInfo {
                index: stream.index,
                codec: stream.codec_name.clone().unwrap_or_else(|| "unknown".into()),
                width: stream.width.unwrap_or(0),
                height: stream.height.unwrap_or(0),
                frame_rate,
                pixel_format: stream.pix_fmt.clone().unwrap_or_default(),
                frame_count: stream.nb_frames.as_deref().and_then(|n| n.parse().ok()),
            });
        }

        Ok(Self {
            path: path.into(),
            duration,
            video_streams,
            format: raw.format.format_name.unwrap_or_default(),
        })
    }

    /// Check if the file has video.
    pub fn has_video(&self) -> bool {
        !self.video_streams.is_empty()
    }

    /// Get the primary video stream info.
    pub fn primary_video(&self) -> Option<&VideoStreamInfo> {
        self.video_streams.first()
    }

    /// Frame count of the primary video stream.
    ///
    /// Uses the header count when present, otherwise `duration * fps` rounded.
    pub fn frame_count(&self) -> Option<usize> {
        let video = self.primary_video()?;
        if let Some(n) = video.frame_count.filter(|&n| n > 0) {
            return Some(n);
        }
        let estimate = self.duration.to_seconds_f64() * video.frame_rate.to_fps_f64();
        Some(estimate.round().max(0.0) as usize)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    index: usize,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    nb_frames: Option<String>,
}
