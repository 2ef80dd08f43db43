//! Remote video acquisition using yt-dlp.
//!
//! Metadata comes from `yt-dlp --dump-single-json`; the download itself is a
//! second yt-dlp invocation that writes one muxed mp4 file.

use ringwatch_core::{FrameRate, Result, RingwatchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Single-file mp4 so the decoder never sees split audio/video downloads.
const DOWNLOAD_FORMAT: &str = "best[ext=mp4]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best";

/// Descriptive metadata of a remote video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub author: String,
    /// Duration in whole seconds
    pub length_secs: u64,
    pub views: u64,
    pub description: String,
    /// Frame rate of the selected stream, when reported
    pub fps: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
}

impl VideoInfo {
    /// Stream frame rate as a rational, when reported.
    pub fn frame_rate(&self) -> Option<FrameRate> {
        self.fps.and_then(|fps| FrameRate::from_fps_f64(fps).ok())
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }
}

/// A remote video identified by URL, with its retrieved metadata.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    url: String,
    info: VideoInfo,
}

impl VideoAsset {
    /// Fetch metadata for `url` without downloading the media.
    pub fn retrieve(url: &str) -> Result<Self> {
        let yt_dlp = locate_yt_dlp()?;
        debug!(url = %url, "Retrieving video metadata");

        let output = Command::new(yt_dlp)
            .args(["--dump-single-json", "--no-playlist", "--no-warnings"])
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RingwatchError::Acquisition(format!("Failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().last().unwrap_or("unknown error");
            return Err(RingwatchError::Acquisition(format!(
                "yt-dlp metadata lookup failed for {url}: {last}"
            )));
        }

        let asset = Self::from_json(url, &String::from_utf8_lossy(&output.stdout))?;
        info!(
            title = %asset.info.title,
            author = %asset.info.author,
            "Retrieved video info"
        );
        Ok(asset)
    }

    /// Build an asset from yt-dlp's JSON metadata dump.
    pub fn from_json(url: &str, json: &str) -> Result<Self> {
        let raw: YtDlpInfo = serde_json::from_str(json)
            .map_err(|e| RingwatchError::Serialization(format!("yt-dlp metadata: {e}")))?;

        let info = VideoInfo {
            title: raw.title.unwrap_or_else(|| "untitled".into()),
            author: raw
                .uploader
                .or(raw.channel)
                .unwrap_or_else(|| "unknown".into()),
            length_secs: raw.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
            views: raw.view_count.unwrap_or(0),
            description: raw.description.unwrap_or_default(),
            fps: raw.fps,
            width: raw.width,
            height: raw.height,
            codec: raw.vcodec.filter(|c| c != "none"),
        };
        Ok(Self {
            url: url.to_string(),
            info,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// `<dir>/<sanitized title>.mp4`
    pub fn default_download_path(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref()
            .join(format!("{}.mp4", sanitize_file_name(&self.info.title)))
    }

    /// Download the video to `output_path`.
    ///
    /// An existing file at the destination is kept as-is.
    pub fn download(&self, output_path: impl AsRef<Path>) -> Result<PathBuf> {
        let output_path = output_path.as_ref();

        if output_path.exists() {
            warn!(
                path = %output_path.display(),
                "File already exists, skipping download"
            );
            return Ok(output_path.to_path_buf());
        }

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let yt_dlp = locate_yt_dlp()?;
        info!(url = %self.url, path = %output_path.display(), "Downloading video");

        let output = Command::new(yt_dlp)
            .args(["--no-playlist", "--no-progress", "-f", DOWNLOAD_FORMAT])
            .args(["--merge-output-format", "mp4", "-o"])
            .arg(output_path)
            .arg(&self.url)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RingwatchError::Acquisition(format!("Failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            let last = stderr.lines().last().unwrap_or("unknown error");
            return Err(RingwatchError::Acquisition(format!(
                "yt-dlp download failed: {last}"
            )));
        }

        if !output_path.exists() {
            return Err(RingwatchError::Acquisition(format!(
                "yt-dlp reported success but {} was not created",
                output_path.display()
            )));
        }

        let size_mb = output_path.metadata()?.len() as f64 / (1024.0 * 1024.0);
        info!(path = %output_path.display(), size_mb, "Downloaded video");
        Ok(output_path.to_path_buf())
    }
}

fn locate_yt_dlp() -> Result<PathBuf> {
    which::which("yt-dlp")
        .map_err(|_| RingwatchError::Acquisition("yt-dlp binary not found on PATH".into()))
}

/// Replace characters that are not allowed in file names on common filesystems.
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    description: Option<String>,
    fps: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    vcodec: Option<String>,
}
