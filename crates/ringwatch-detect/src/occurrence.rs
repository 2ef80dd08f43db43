//! Pairing fade-in detections with the fade-out that closes them.

use crate::error::DetectResult;
use crate::report::{DetectionSpan, DetectionTable};
use ringwatch_core::FrameRate;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One full appearance of the pattern, from fade-in to fade-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Occurrence {
    pub start_frame: usize,
    /// Exclusive.
    pub end_frame: usize,
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Match every fade-in span with the first unused fade-out span that starts
/// no earlier than it and no more than `max_gap_frames` after it ends.
pub fn pair_occurrences(
    fade_in: &DetectionTable,
    fade_out: &DetectionTable,
    max_gap_frames: usize,
    rate: FrameRate,
) -> Vec<Occurrence> {
    let outs = fade_out.spans();
    let mut used = vec![false; outs.len()];
    let fps = rate.to_fps_f64();

    let mut occurrences = Vec::new();
    for span in fade_in.spans() {
        let Some(idx) = outs.iter().enumerate().position(|(i, out)| {
            !used[i] && closes(&span, out, max_gap_frames)
        }) else {
            continue;
        };
        used[idx] = true;
        let end_frame = outs[idx].end_frame;
        occurrences.push(Occurrence {
            start_frame: span.start_frame,
            end_frame,
            start_secs: span.start_frame as f64 / fps,
            end_secs: end_frame as f64 / fps,
        });
    }
    occurrences
}

fn closes(fade_in: &DetectionSpan, fade_out: &DetectionSpan, max_gap_frames: usize) -> bool {
    fade_out.start_frame >= fade_in.start_frame
        && fade_out.start_frame.saturating_sub(fade_in.end_frame) <= max_gap_frames
}

/// Write paired occurrences as CSV, creating parent directories.
pub fn write_occurrences_csv(path: &Path, occurrences: &[Occurrence]) -> DetectResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for occurrence in occurrences {
        writer.serialize(occurrence)?;
    }
    writer.flush()?;
    info!(count = occurrences.len(), path = %path.display(), "Wrote occurrences");
    Ok(())
}
