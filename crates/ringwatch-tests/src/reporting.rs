//! Result tables, CSV output and fade-in/fade-out pairing.

use crate::fixtures::*;
use ringwatch_core::FrameRate;
use ringwatch_detect::{
    pair_occurrences, write_occurrences_csv, DetectionTable, Detector, GridEmbedder,
};
use std::sync::Arc;

fn scan(config: ringwatch_detect::DetectorConfig) -> DetectionTable {
    let detector = Detector::new(config, &provider(), Arc::new(GridEmbedder::default())).unwrap();
    detector.detect(&mut reference_video()).unwrap()
}

#[test]
fn threshold_change_only_touches_detect_column() {
    let strict = scan(fade_in_config(0.79));
    let loose = strict.relabel(0.73);
    assert_eq!(strict.rows().len(), loose.rows().len());
    for (a, b) in strict.rows().iter().zip(loose.rows()) {
        assert_eq!(a.frame_idx, b.frame_idx);
        assert_eq!(a.score, b.score);
        assert_eq!(b.detect, b.score > 0.73);
    }
}

#[test]
fn csv_round_trip_keeps_rows() {
    let table = scan(fade_in_config(0.79));
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join(table.output_file_name("20240101_0000"));
    table.write_csv(&path).unwrap();

    assert!(path.ends_with("20240101_0000_fade_in_predictions.csv"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("frame_idx,score,detect\n"));
    assert_eq!(text.lines().count(), table.rows().len() + 1);

    let reloaded = DetectionTable::read_csv(&path, "fade_in", 0.79, 30).unwrap();
    assert_eq!(reloaded, table);
}

#[test]
fn fade_in_and_fade_out_pair_into_occurrences() {
    let fade_in = scan(fade_in_config(0.79));
    let fade_out = scan(fade_out_config(0.73));

    let occurrences = pair_occurrences(&fade_in, &fade_out, 30, FrameRate::FPS_30);
    let frames: Vec<(usize, usize)> = occurrences
        .iter()
        .map(|o| (o.start_frame, o.end_frame))
        .collect();
    assert_eq!(frames, vec![(60, 120), (150, 210), (240, 300)]);
    assert!((occurrences[1].start_secs - 5.0).abs() < 1e-9);
    assert!((occurrences[1].end_secs - 7.0).abs() < 1e-9);

    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("occurrences.csv");
    write_occurrences_csv(&path, &occurrences).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
}

#[test]
fn spans_cover_detected_windows() {
    let table = scan(fade_out_config(0.73));
    let spans = table.spans();
    assert_eq!(spans.len(), 3);
    for span in spans {
        assert_eq!(span.len(), 30);
        assert!(span.peak_score > 0.95);
    }
}
