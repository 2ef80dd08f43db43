//! Random-access frame sources.
//!
//! Everything the detector consumes goes through [`FrameSource`]: a decoded
//! file on disk, or an in-memory [`FrameSequence`] extracted from one.

use ringwatch_core::{FrameBuffer, FrameRate, RationalTime, Result, RingwatchError, TimeRange};

/// A video that can report its length and hand out frame ranges.
pub trait FrameSource: Send {
    /// Number of frames reported for this source.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Native frame rate.
    fn frame_rate(&self) -> FrameRate;

    /// Decode frames `[start, end)`. `None` reads to the end of the source.
    ///
    /// Implementations may return fewer frames than requested when the
    /// reported length overstates the decodable content.
    fn read_range(&mut self, start: usize, end: Option<usize>) -> Result<Vec<FrameBuffer>>;

    /// Every frame, when the source already holds them decoded in memory.
    fn as_frames(&self) -> Option<&[FrameBuffer]> {
        None
    }

    /// Decode the frames covering `[start, end)`. `None` reads to the end.
    fn read_time_range(
        &mut self,
        start: RationalTime,
        end: Option<RationalTime>,
    ) -> Result<Vec<FrameBuffer>> {
        let rate = self.frame_rate();
        match end {
            Some(end) => {
                let (first, last) = TimeRange::new(start, end)?.frame_indices(rate);
                self.read_range(first, Some(last))
            }
            None => {
                if start.is_negative() {
                    return Err(RingwatchError::InvalidParameter(format!(
                        "Read starts before zero: {start}"
                    )));
                }
                self.read_range(start.to_frames(rate) as usize, None)
            }
        }
    }
}

/// Frames held in memory at a known frame rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<FrameBuffer>,
    frame_rate: FrameRate,
}

impl FrameSequence {
    pub fn new(frames: Vec<FrameBuffer>, frame_rate: FrameRate) -> Self {
        Self { frames, frame_rate }
    }

    pub fn frames(&self) -> &[FrameBuffer] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<FrameBuffer> {
        self.frames
    }

    /// Frame dimensions, taken from the first frame.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width, f.height))
    }
}

impl FrameSource for FrameSequence {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    fn read_range(&mut self, start: usize, end: Option<usize>) -> Result<Vec<FrameBuffer>> {
        if let Some(end) = end.filter(|&end| end < start) {
            return Err(RingwatchError::InvalidParameter(format!(
                "Frame range {start}..{end} is inverted"
            )));
        }
        let len = self.frames.len();
        let end = end.unwrap_or(len).min(len);
        let start = start.min(end);
        Ok(self.frames[start..end].to_vec())
    }

    fn as_frames(&self) -> Option<&[FrameBuffer]> {
        Some(&self.frames)
    }
}
