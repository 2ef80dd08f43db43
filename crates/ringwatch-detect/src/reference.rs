//! Labeled reference occurrences and the sources they are read from.

use crate::error::{DetectError, DetectResult};
use parking_lot::Mutex;
use ringwatch_core::{RationalTime, TimeRange};
use ringwatch_media::{FrameSequence, FrameSource};
use std::collections::HashMap;
use tracing::info;

/// Opens a frame source for a video identity (URL or path).
pub trait VideoProvider: Send + Sync {
    fn open(&self, identity: &str) -> DetectResult<Box<dyn FrameSource>>;
}

/// Serves in-memory sequences registered under an identity.
#[derive(Default)]
pub struct InMemoryProvider {
    videos: Mutex<HashMap<String, FrameSequence>>,
}

impl InMemoryProvider {
    /// An empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`InMemoryProvider::insert`].
    pub fn with_video(self, identity: impl Into<String>, video: FrameSequence) -> Self {
        self.insert(identity, video);
        self
    }

    /// Register `video` under `identity`, replacing any previous entry.
    pub fn insert(&self, identity: impl Into<String>, video: FrameSequence) {
        self.videos.lock().insert(identity.into(), video);
    }
}

impl VideoProvider for InMemoryProvider {
    fn open(&self, identity: &str) -> DetectResult<Box<dyn FrameSource>> {
        let videos = self.videos.lock();
        let video = videos.get(identity).ok_or_else(|| {
            DetectError::Media(ringwatch_core::RingwatchError::NotFound(format!(
                "no video registered as {identity:?}"
            )))
        })?;
        Ok(Box::new(video.clone()))
    }
}

/// One known occurrence of the target pattern inside a source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    range: TimeRange,
    source: String,
}

impl ReferenceSequence {
    /// Occurrence spanning `range` of `source`.
    pub fn new(range: TimeRange, source: impl Into<String>) -> Self {
        Self {
            range,
            source: source.into(),
        }
    }

    /// `[start, start + duration)` in `source`.
    pub fn starting_at(
        start: RationalTime,
        duration: RationalTime,
        source: impl Into<String>,
    ) -> DetectResult<Self> {
        let range = TimeRange::starting_at(start, duration)
            .map_err(|e| DetectError::Config(e.to_string()))?;
        Ok(Self::new(range, source))
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Read this occurrence's frames into a standalone sequence.
    ///
    /// The source is opened for this call only and released before returning.
    pub fn extract(&self, provider: &dyn VideoProvider) -> DetectResult<FrameSequence> {
        let mut video = provider.open(&self.source)?;
        let rate = video.frame_rate();
        let frames = video.read_time_range(self.range.start(), Some(self.range.end()))?;
        drop(video);

        if frames.is_empty() {
            return Err(DetectError::EmptyReference {
                source_id: self.source.clone(),
                start: self.range.start().to_string(),
            });
        }

        info!(
            frames = frames.len(),
            range = %self.range,
            "Retrieved frames for reference sequence"
        );
        Ok(FrameSequence::new(frames, rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringwatch_core::{FrameBuffer, FrameRate};

    fn provider_with(len: usize) -> InMemoryProvider {
        let frames = (0..len)
            .map(|i| FrameBuffer::filled(4, 4, [(i % 256) as u8, 0, 0]))
            .collect();
        InMemoryProvider::new().with_video("ref", FrameSequence::new(frames, FrameRate::FPS_30))
    }

    #[test]
    fn test_extract_one_second_at_30fps() {
        let provider = provider_with(300);
        let reference = ReferenceSequence::starting_at(
            RationalTime::from_min_sec(0, 2, 0),
            RationalTime::new(1, 1),
            "ref",
        )
        .unwrap();
        let seq = reference.extract(&provider).unwrap();
        assert_eq!(seq.len(), 30);
        assert_eq!(seq.frames()[0].pixel_rgb(0, 0)[0], 60);
        assert_eq!(seq.frame_rate(), FrameRate::FPS_30);
    }

    #[test]
    fn test_extract_past_end_is_empty_reference() {
        let provider = provider_with(30);
        let reference =
            ReferenceSequence::starting_at(RationalTime::new(5, 1), RationalTime::new(1, 1), "ref")
                .unwrap();
        assert!(matches!(
            reference.extract(&provider),
            Err(DetectError::EmptyReference { .. })
        ));
    }

    #[test]
    fn test_unknown_source_fails() {
        let provider = provider_with(30);
        let reference =
            ReferenceSequence::starting_at(RationalTime::ZERO, RationalTime::new(1, 1), "missing")
                .unwrap();
        assert!(matches!(reference.extract(&provider), Err(DetectError::Media(_))));
    }

    #[test]
    fn test_zero_duration_is_config_error() {
        assert!(matches!(
            ReferenceSequence::starting_at(RationalTime::new(1, 1), RationalTime::ZERO, "ref"),
            Err(DetectError::Config(_))
        ));
    }
}
