//! Synthetic videos shared by the integration tests.

use ringwatch_core::{FrameBuffer, FrameRate, PixelFormat, RationalTime};
use ringwatch_detect::{DetectorConfig, InMemoryProvider};
use ringwatch_media::FrameSequence;

pub const SIDE: u32 = 16;
pub const REFERENCE: &str = "memory://reference";

/// Ring colours placed in five of the sixteen 4x4 cells.
const RINGS: [((u32, u32), [u8; 3]); 5] = [
    ((0, 1), [0, 129, 200]),
    ((1, 1), [0, 0, 0]),
    ((2, 1), [238, 51, 78]),
    ((1, 2), [255, 200, 0]),
    ((2, 2), [0, 166, 81]),
];

fn paint(background: impl Fn(u32, u32) -> [u8; 3]) -> FrameBuffer {
    let mut data = Vec::with_capacity((SIDE * SIDE * 3) as usize);
    for y in 0..SIDE {
        for x in 0..SIDE {
            let cell = (x / 4, y / 4);
            let rgb = RINGS
                .iter()
                .find(|(pos, _)| *pos == cell)
                .map(|(_, rgb)| *rgb)
                .unwrap_or_else(|| background(x, y));
            data.extend_from_slice(&rgb);
        }
    }
    FrameBuffer::from_packed(SIDE, SIDE, PixelFormat::Rgb8, &data).unwrap()
}

/// Rings on white, as the bumper looks once faded in.
pub fn rings_on_white() -> FrameBuffer {
    paint(|_, _| [250, 250, 250])
}

/// Rings on black, as the bumper looks while fading out.
pub fn rings_on_black() -> FrameBuffer {
    paint(|_, _| [5, 5, 5])
}

/// Slowly moving magenta-green content unrelated to the bumper. Its channels
/// sit on both sides of mid-grey, so it resembles neither white nor black.
pub fn filler(index: usize) -> FrameBuffer {
    let mut data = Vec::with_capacity((SIDE * SIDE * 3) as usize);
    for y in 0..SIDE {
        for x in 0..SIDE {
            let t = (index as u32 + x * 3 + y * 5) % 40;
            data.extend_from_slice(&[(200 + t) as u8, (40 + t) as u8, (100 + t) as u8]);
        }
    }
    FrameBuffer::from_packed(SIDE, SIDE, PixelFormat::Rgb8, &data).unwrap()
}

/// 12 s at 30 fps. Rings on white fill `[60, 90)`, `[150, 180)` and
/// `[240, 270)`; each is followed by one second of rings on black.
pub fn reference_video() -> FrameSequence {
    let frames = (0..360)
        .map(|i| match i {
            60..=89 | 150..=179 | 240..=269 => rings_on_white(),
            90..=119 | 180..=209 | 270..=299 => rings_on_black(),
            _ => filler(i),
        })
        .collect();
    FrameSequence::new(frames, FrameRate::FPS_30)
}

/// `len` frames of filler only.
pub fn unrelated_video(len: usize) -> FrameSequence {
    FrameSequence::new((0..len).map(filler).collect(), FrameRate::FPS_30)
}

pub fn provider() -> InMemoryProvider {
    InMemoryProvider::new().with_video(REFERENCE, reference_video())
}

fn seconds(values: &[i64]) -> Vec<RationalTime> {
    values.iter().map(|&s| RationalTime::new(s, 1)).collect()
}

pub fn fade_in_config(threshold: f32) -> DetectorConfig {
    DetectorConfig {
        label: "fade_in".into(),
        source: REFERENCE.into(),
        start_times: seconds(&[2, 5, 8]),
        sequence_duration: RationalTime::new(1, 1),
        threshold,
    }
}

pub fn fade_out_config(threshold: f32) -> DetectorConfig {
    DetectorConfig {
        label: "fade_out".into(),
        start_times: seconds(&[3, 6, 9]),
        ..fade_in_config(threshold)
    }
}
