//! Built-in Olympic rings bumper references.
//!
//! The bumper appears three times in the reference broadcast. Its fade-in and
//! fade-out look different enough that each gets its own detector.

use crate::detector::DetectorConfig;
use ringwatch_core::RationalTime;

/// Broadcast holding the labeled bumper occurrences.
pub const REFERENCE_VIDEO_URL: &str = "https://www.youtube.com/watch?v=45KmZUc0CzA";

pub const FADE_IN_LABEL: &str = "fade_in";
pub const FADE_OUT_LABEL: &str = "fade_out";

/// Fade-in threshold, tuned on the reference broadcast.
pub const FADE_IN_THRESHOLD: f32 = 0.79;
/// Fade-out threshold, tuned on the reference broadcast.
pub const FADE_OUT_THRESHOLD: f32 = 0.73;

/// Longest fade-in to fade-out gap still paired as one occurrence.
pub const MAX_OCCURRENCE_GAP_SECS: f64 = 45.0;

/// Fade-in starts as `(minutes, seconds, microseconds)`.
const FADE_IN_STARTS: [(i64, i64, i64); 3] = [(0, 58, 800_000), (2, 51, 250_000), (4, 42, 400_000)];
const FADE_OUT_STARTS: [(i64, i64, i64); 3] = [(1, 6, 500_000), (3, 0, 300_000), (5, 16, 750_000)];

fn starts(table: &[(i64, i64, i64)]) -> Vec<RationalTime> {
    table
        .iter()
        .map(|&(m, s, us)| RationalTime::from_min_sec(m, s, us))
        .collect()
}

fn one_second() -> RationalTime {
    RationalTime::new(1, 1)
}

impl DetectorConfig {
    /// Fade-in detector for the reference broadcast.
    pub fn fade_in() -> Self {
        Self {
            label: FADE_IN_LABEL.into(),
            source: REFERENCE_VIDEO_URL.into(),
            start_times: starts(&FADE_IN_STARTS),
            sequence_duration: one_second(),
            threshold: FADE_IN_THRESHOLD,
        }
    }

    /// Fade-out detector for the reference broadcast.
    pub fn fade_out() -> Self {
        Self {
            label: FADE_OUT_LABEL.into(),
            source: REFERENCE_VIDEO_URL.into(),
            start_times: starts(&FADE_OUT_STARTS),
            sequence_duration: one_second(),
            threshold: FADE_OUT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringwatch_core::FrameRate;

    #[test]
    fn test_presets_validate() {
        DetectorConfig::fade_in().validate().unwrap();
        DetectorConfig::fade_out().validate().unwrap();
    }

    #[test]
    fn test_fade_in_frame_indices() {
        let config = DetectorConfig::fade_in();
        let frames: Vec<i64> = config
            .start_times
            .iter()
            .map(|t| t.to_frames(FrameRate::FPS_30))
            .collect();
        // 58.8 s, 171.25 s and 282.4 s at 30 fps
        assert_eq!(frames, vec![1764, 5137, 8472]);
    }

    #[test]
    fn test_fade_out_follows_fade_in() {
        let ins = DetectorConfig::fade_in().start_times;
        let outs = DetectorConfig::fade_out().start_times;
        for (a, b) in ins.iter().zip(&outs) {
            assert!(a < b);
            assert!((*b - *a).to_seconds_f64() < MAX_OCCURRENCE_GAP_SECS);
        }
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(DetectorConfig::fade_in().threshold, 0.79);
        assert_eq!(DetectorConfig::fade_out().threshold, 0.73);
    }
}
