//! Time representation for frame-accurate sequence extraction
//!
//! Uses rational numbers to avoid floating-point accumulation errors.
//! All time values are represented as numerator/denominator pairs.

use crate::error::{Result, RingwatchError};
use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A rational time value representing a point in time, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    value: Rational64,
}

impl RationalTime {
    /// Create a new RationalTime of `numerator / denominator` seconds.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Create a RationalTime from a frame number and frame rate.
    #[inline]
    pub fn from_frames(frames: i64, rate: FrameRate) -> Self {
        Self {
            value: Rational64::new(frames * rate.denominator as i64, rate.numerator as i64),
        }
    }

    /// Create a RationalTime from seconds as a float, at microsecond precision.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        const PRECISION: i64 = 1_000_000;
        Self {
            value: Rational64::new((seconds * PRECISION as f64).round() as i64, PRECISION),
        }
    }

    /// Create a RationalTime from a `minutes:seconds.fraction` timestamp.
    pub fn from_min_sec(minutes: i64, seconds: i64, microseconds: i64) -> Self {
        Self {
            value: Rational64::new((minutes * 60 + seconds) * 1_000_000 + microseconds, 1_000_000),
        }
    }

    /// Convert to seconds as f64.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Frame index at the given rate, rounded down.
    #[inline]
    pub fn to_frames(self, rate: FrameRate) -> i64 {
        (self.value * rate.as_rational()).floor().to_integer()
    }

    /// Frame index at the given rate, rounded up.
    #[inline]
    pub fn to_frames_ceil(self, rate: FrameRate) -> i64 {
        (self.value * rate.as_rational()).ceil().to_integer()
    }

    /// Zero time constant.
    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };

    #[inline]
    pub fn is_zero(self) -> bool {
        *self.value.numer() == 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        *self.value.numer() < 0
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.to_seconds_f64();
        let minutes = (total / 60.0).floor();
        write!(f, "{}:{:06.3}", minutes as i64, total - minutes * 60.0)
    }
}

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Approximate a floating-point rate at millihertz precision.
    pub fn from_fps_f64(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(RingwatchError::InvalidParameter(format!(
                "Frame rate must be positive, got {fps}"
            )));
        }
        let ratio = Rational64::new((fps * 1000.0).round() as i64, 1000);
        Self::from_parts(*ratio.numer(), *ratio.denom())
    }

    fn from_parts(numerator: i64, denominator: i64) -> Result<Self> {
        if numerator <= 0 || denominator <= 0 {
            return Err(RingwatchError::InvalidParameter(format!(
                "Invalid frame rate {numerator}/{denominator}"
            )));
        }
        let numerator = u32::try_from(numerator).map_err(|_| {
            RingwatchError::InvalidParameter(format!("Frame rate numerator {numerator} too large"))
        })?;
        let denominator = u32::try_from(denominator).map_err(|_| {
            RingwatchError::InvalidParameter(format!(
                "Frame rate denominator {denominator} too large"
            ))
        })?;
        Ok(Self::new(numerator, denominator))
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    #[inline]
    fn as_rational(self) -> Rational64 {
        Rational64::new(self.numerator as i64, self.denominator as i64)
    }

    /// Duration of a single frame.
    #[inline]
    pub fn frame_duration(self) -> RationalTime {
        RationalTime::new(self.denominator as i64, self.numerator as i64)
    }

    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl FromStr for FrameRate {
    type Err = RingwatchError;

    /// Parses the forms ffprobe and yt-dlp emit: `"30000/1001"`, `"25"`, `"29.97"`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((num, den)) = s.split_once('/') {
            let parse = |part: &str| {
                part.trim().parse::<i64>().map_err(|_| {
                    RingwatchError::InvalidParameter(format!("Invalid frame rate: {s:?}"))
                })
            };
            let (num, den) = (parse(num)?, parse(den)?);
            if den == 0 {
                return Err(RingwatchError::InvalidParameter(format!(
                    "Invalid frame rate: {s:?}"
                )));
            }
            let ratio = Rational64::new(num, den);
            return Self::from_parts(*ratio.numer(), *ratio.denom());
        }
        let fps: f64 = s
            .parse()
            .map_err(|_| RingwatchError::InvalidParameter(format!("Invalid frame rate: {s:?}")))?;
        Self::from_fps_f64(fps)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// A video-relative time range with inclusive start and exclusive end.
///
/// Invariant: `start < end`, `start >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    start: RationalTime,
    end: RationalTime,
}

impl TimeRange {
    /// Create a time range from start and end times.
    pub fn new(start: RationalTime, end: RationalTime) -> Result<Self> {
        if start.is_negative() {
            return Err(RingwatchError::InvalidParameter(format!(
                "Time range starts before zero: {start}"
            )));
        }
        if start >= end {
            return Err(RingwatchError::InvalidParameter(format!(
                "Time range start {start} is not before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Create a time range from a start time and a duration.
    pub fn starting_at(start: RationalTime, duration: RationalTime) -> Result<Self> {
        Self::new(start, start + duration)
    }

    #[inline]
    pub fn start(self) -> RationalTime {
        self.start
    }

    #[inline]
    pub fn end(self) -> RationalTime {
        self.end
    }

    #[inline]
    pub fn duration(self) -> RationalTime {
        self.end - self.start
    }

    /// Check if a time is within this range.
    #[inline]
    pub fn contains(self, time: RationalTime) -> bool {
        time >= self.start && time < self.end
    }

    /// Frame indices covered by this range at `rate`, as `(start, end_exclusive)`.
    ///
    /// The start index is rounded down and the end index rounded up, so a
    /// range always covers at least one frame.
    pub fn frame_indices(self, rate: FrameRate) -> (usize, usize) {
        let start = self.start.to_frames(rate).max(0) as usize;
        let end = self.end.to_frames_ceil(rate).max(0) as usize;
        (start, end.max(start + 1))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
