//! Frame buffer types for decoded video frames in CPU memory.
//!
//! Frames are decoded at a reduced analysis resolution, so a whole video
//! can be held in memory for a single bulk read.

use crate::error::{Result, RingwatchError};
use serde::{Deserialize, Serialize};

/// Pixel format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bits per pixel), what ffmpeg emits as `rgb24`
    #[default]
    Rgb8,
    /// 8-bit RGBA (32 bits per pixel)
    Rgba8,
    /// 8-bit grayscale
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
            Self::Gray8 => 1,
        }
    }

    /// Calculate total bytes needed for a tightly packed frame of this format.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }

    /// The matching ffmpeg `-pix_fmt` name.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Rgb8 => "rgb24",
            Self::Rgba8 => "rgba",
            Self::Gray8 => "gray",
        }
    }
}

/// A plane of pixel data with stride information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlane {
    /// Raw pixel data
    pub data: Vec<u8>,
    /// Bytes per row (may include padding)
    pub stride: usize,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    bytes_per_pixel: usize,
}

impl FramePlane {
    /// Create a zeroed plane with the given dimensions.
    pub fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Self {
        // Align stride to 64 bytes for SIMD-friendly row access
        let min_stride = (width as usize) * bytes_per_pixel;
        let stride = (min_stride + 63) & !63;
        Self {
            data: vec![0u8; stride * height as usize],
            stride,
            width,
            height,
            bytes_per_pixel,
        }
    }

    /// Get a row of pixel data, without padding.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * self.bytes_per_pixel;
        &self.data[start..end]
    }

    /// Get a mutable row of pixel data, without padding.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let end = start + self.width as usize * self.bytes_per_pixel;
        &mut self.data[start..end]
    }
}

/// A decoded video frame in CPU memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixel format
    pub format: PixelFormat,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    plane: FramePlane,
}

impl FrameBuffer {
    /// Create a black frame buffer with the given dimensions and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            format,
            width,
            height,
            plane: FramePlane::new(width, height, format.bytes_per_pixel()),
        }
    }

    /// Build a frame from tightly packed pixel data (no row padding).
    pub fn from_packed(width: u32, height: u32, format: PixelFormat, data: &[u8]) -> Result<Self> {
        let expected = format.frame_size(width, height);
        if data.len() != expected {
            return Err(RingwatchError::InvalidParameter(format!(
                "Packed {:?} frame of {}x{} needs {} bytes, got {}",
                format,
                width,
                height,
                expected,
                data.len()
            )));
        }

        let mut frame = Self::new(width, height, format);
        let row_len = width as usize * format.bytes_per_pixel();
        if row_len > 0 {
            for (y, src) in data.chunks_exact(row_len).enumerate() {
                frame.plane.row_mut(y as u32).copy_from_slice(src);
            }
        }
        Ok(frame)
    }

    /// Create an RGB8 frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut frame = Self::new(width, height, PixelFormat::Rgb8);
        for y in 0..height {
            for px in frame.plane.row_mut(y).chunks_exact_mut(3) {
                px.copy_from_slice(&rgb);
            }
        }
        frame
    }

    /// Create an RGB8 test pattern frame (8 vertical color bars).
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 3]; 8] = [
            [255, 255, 255], // White
            [255, 255, 0],   // Yellow
            [0, 255, 255],   // Cyan
            [0, 255, 0],     // Green
            [255, 0, 255],   // Magenta
            [255, 0, 0],     // Red
            [0, 0, 255],     // Blue
            [0, 0, 0],       // Black
        ];

        let mut frame = Self::new(width, height, PixelFormat::Rgb8);
        for y in 0..height {
            let row = frame.plane.row_mut(y);
            for x in 0..width {
                let bar = (x * 8 / width.max(1)) as usize;
                let i = x as usize * 3;
                row[i..i + 3].copy_from_slice(&BARS[bar.min(7)]);
            }
        }
        frame
    }

    /// Total memory usage of this frame in bytes.
    pub fn memory_size(&self) -> usize {
        self.plane.data.len()
    }

    /// Get the pixel plane.
    #[inline]
    pub fn plane(&self) -> &FramePlane {
        &self.plane
    }

    /// Get the pixel plane mutably.
    #[inline]
    pub fn plane_mut(&mut self) -> &mut FramePlane {
        &mut self.plane
    }

    /// Get a row of pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        self.plane.row(y)
    }

    /// RGB value of a pixel, whatever the storage format.
    #[inline]
    pub fn pixel_rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let row = self.plane.row(y);
        let bpp = self.format.bytes_per_pixel();
        let i = x as usize * bpp;
        match self.format {
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => [row[i], row[i + 1], row[i + 2]],
            PixelFormat::Gray8 => [row[i]; 3],
        }
    }

    /// Copy the pixels out without row padding.
    pub fn to_packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.format.frame_size(self.width, self.height));
        for y in 0..self.height {
            out.extend_from_slice(self.plane.row(y));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_is_aligned() {
        let frame = FrameBuffer::new(100, 10, PixelFormat::Rgb8);
        assert_eq!(frame.plane().stride % 64, 0);
        assert!(frame.memory_size() >= 100 * 10 * 3);
    }

    #[test]
    fn test_packed_roundtrip_strips_padding() {
        let data: Vec<u8> = (0..(5 * 3 * 3)).map(|v| v as u8).collect();
        let frame = FrameBuffer::from_packed(5, 3, PixelFormat::Rgb8, &data).unwrap();
        assert_eq!(frame.row(1), &data[15..30]);
        assert_eq!(frame.to_packed(), data);
    }

    #[test]
    fn test_from_packed_rejects_wrong_length() {
        let err = FrameBuffer::from_packed(4, 4, PixelFormat::Rgb8, &[0u8; 10]);
        assert!(err.is_err());
    }

    #[test]
    fn test_filled_frame() {
        let frame = FrameBuffer::filled(8, 8, [10, 20, 30]);
        assert_eq!(frame.pixel_rgb(7, 7), [10, 20, 30]);
    }

    #[test]
    fn test_test_pattern() {
        let frame = FrameBuffer::test_pattern(64, 16);
        assert_eq!(frame.pixel_rgb(0, 0), [255, 255, 255]);
        assert_eq!(frame.pixel_rgb(63, 15), [0, 0, 0]);
    }

    #[test]
    fn test_gray_pixel_expands() {
        let frame = FrameBuffer::from_packed(2, 1, PixelFormat::Gray8, &[7, 9]).unwrap();
        assert_eq!(frame.pixel_rgb(1, 0), [9, 9, 9]);
    }
}
