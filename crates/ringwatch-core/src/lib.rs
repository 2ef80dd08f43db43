//! Ringwatch Core - Foundation types for sequence detection
//!
//! This crate provides the fundamental types used throughout Ringwatch:
//! - Time representation (RationalTime, FrameRate, TimeRange)
//! - Frame buffers and pixel formats
//! - Memory budgeting for bulk frame reads

pub mod error;
pub mod frame;
pub mod time;

pub use error::{Result, RingwatchError};
pub use frame::{FrameBuffer, FramePlane, PixelFormat};
pub use time::{FrameRate, RationalTime, TimeRange};

/// Memory budget for decoded frames held in RAM.
pub mod frame_budget {
    use crate::PixelFormat;

    /// A bulk read above this size is logged as a warning (2 GB).
    pub const BULK_READ_WARN_BYTES: usize = 2 * 1024 * 1024 * 1024;

    /// Default decode width. Frames are scaled down before analysis.
    pub const DEFAULT_DECODE_WIDTH: u32 = 224;

    /// Default decode height.
    pub const DEFAULT_DECODE_HEIGHT: u32 = 224;

    /// Estimate the bytes needed to hold `frames` decoded frames.
    pub fn estimate_bulk_bytes(frames: usize, width: u32, height: u32, format: PixelFormat) -> usize {
        frames.saturating_mul(format.frame_size(width, height))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_estimate_bulk_bytes() {
            // One minute of 224x224 RGB at 30 fps
            let bytes = estimate_bulk_bytes(1800, 224, 224, PixelFormat::Rgb8);
            assert_eq!(bytes, 1800 * 224 * 224 * 3);
        }

        #[test]
        fn test_estimate_saturates() {
            let bytes = estimate_bulk_bytes(usize::MAX, 4096, 4096, PixelFormat::Rgba8);
            assert_eq!(bytes, usize::MAX);
        }
    }
}
