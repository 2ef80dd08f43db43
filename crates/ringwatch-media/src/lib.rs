//! Ringwatch Media - FFmpeg and yt-dlp integration for video I/O
//!
//! This crate handles:
//! - The `FrameSource` abstraction and its in-memory implementation
//! - Video decoding into RGB frames
//! - Media file probing
//! - Writing frame sequences back to playable clips
//! - Remote video acquisition

pub mod clip_writer;
pub mod decoder;
pub mod probe;
pub mod retriever;
pub mod source;

pub use clip_writer::ClipWriter;
pub use decoder::{DecodeOptions, VideoDecoder};
pub use probe::{MediaProbe, VideoStreamInfo};
pub use retriever::{VideoAsset, VideoInfo};
pub use source::{FrameSequence, FrameSource};

use ringwatch_core::{Result, RingwatchError};

/// Check that the FFmpeg toolchain is reachable (call once at startup).
pub fn init() -> Result<()> {
    if !ffmpeg_sidecar::command::ffmpeg_is_installed() {
        return Err(RingwatchError::NotFound(
            "ffmpeg binary not found on PATH".into(),
        ));
    }
    tracing::info!("Ringwatch media initialized");
    Ok(())
}
