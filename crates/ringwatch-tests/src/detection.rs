//! Bootstrap and scan behaviour across core, media and detect.

use crate::fixtures::*;
use ringwatch_core::FrameRate;
use ringwatch_detect::{
    bootstrap, CosineSimilarity, DetectError, DetectOptions, Detector, Embedder, EmbeddingLayout,
    GridEmbedder, MeanPooled, Metric, ReadMode,
};
use ringwatch_media::FrameSequence;
use std::sync::Arc;

fn grid() -> Arc<dyn Embedder> {
    Arc::new(GridEmbedder::default())
}

// ── Bootstrap ──────────────────────────────────────────────────

#[test]
fn bootstrap_is_deterministic() {
    let provider = provider();
    let references = fade_in_config(0.79).references().unwrap();
    let embedder = GridEmbedder::default();
    let first = bootstrap(&references, &provider, &embedder).unwrap();
    let second = bootstrap(&references, &provider, &embedder).unwrap();
    assert_eq!(first, second);
}

#[test]
fn discriminator_keeps_reference_shape() {
    let provider = provider();
    let embedder = GridEmbedder::default();
    let references = fade_in_config(0.79).references().unwrap();
    let discriminator = bootstrap(&references, &provider, &embedder).unwrap();

    for reference in &references {
        let frames = reference.extract(&provider).unwrap();
        let single = embedder.embed(frames.frames()).unwrap();
        assert_eq!(single.shape(), discriminator.shape());
    }
    assert_eq!(discriminator.shape(), (30, 48));
    assert_eq!(discriminator.layout(), EmbeddingLayout::PerFrame);
}

#[test]
fn missing_reference_video_aborts_construction() {
    let mut config = fade_in_config(0.79);
    config.source = "memory://nowhere".into();
    let result = Detector::new(config, &provider(), grid());
    assert!(matches!(result, Err(DetectError::Media(_))));
}

#[test]
fn invalid_threshold_is_rejected_before_bootstrap() {
    for threshold in [0.0, -0.5, f32::INFINITY] {
        let result = Detector::new(fade_in_config(threshold), &provider(), grid());
        assert!(matches!(result, Err(DetectError::Config(_))), "{threshold}");
    }
}

// ── Scanning ───────────────────────────────────────────────────

#[test]
fn identical_content_scores_high_at_reference_positions() {
    let detector = Detector::new(fade_in_config(0.95), &provider(), grid()).unwrap();
    let mut target = reference_video();
    let table = detector.detect(&mut target).unwrap();

    for frame_idx in [60, 150, 240] {
        let row = table
            .rows()
            .iter()
            .find(|row| row.frame_idx == frame_idx)
            .unwrap();
        assert!(row.score > 0.95, "{frame_idx}: {}", row.score);
        assert!(row.detect);
    }
    let hits: Vec<usize> = table.detected().map(|row| row.frame_idx).collect();
    assert_eq!(hits, vec![60, 150, 240]);
}

#[test]
fn unrelated_content_is_never_detected() {
    let detector = Detector::new(fade_in_config(0.7), &provider(), grid()).unwrap();
    let mut target = unrelated_video(600);
    let table = detector.detect(&mut target).unwrap();
    assert!(!table.is_empty());
    assert!(table.rows().iter().all(|row| !row.detect));
    assert!(table.rows().iter().all(|row| (-1.0..=1.0).contains(&row.score)));
}

#[test]
fn row_count_and_spacing_follow_stride() {
    let detector = Detector::new(fade_in_config(0.79), &provider(), grid()).unwrap();
    let stride = detector.stride();
    assert_eq!(stride, 30);

    for len in [0, 30, 31, 32, 61, 62, 91, 100, 155] {
        let mut target = unrelated_video(len);
        let table = detector.detect(&mut target).unwrap();
        let expected = if len > stride + 1 {
            (len - stride - 1) / stride + 1
        } else {
            0
        };
        assert_eq!(table.rows().len(), expected, "len {len}");
        for pair in table.rows().windows(2) {
            assert_eq!(pair[1].frame_idx - pair[0].frame_idx, stride);
        }
        if let Some(first) = table.rows().first() {
            assert_eq!(first.frame_idx, 0);
        }
    }
}

#[test]
fn aligned_occurrence_in_longer_video_is_found() {
    let detector = Detector::new(fade_in_config(0.9), &provider(), grid()).unwrap();
    let mut frames = unrelated_video(900).into_frames();
    for frame in &mut frames[450..480] {
        *frame = rings_on_white();
    }
    let mut target = FrameSequence::new(frames, FrameRate::FPS_30);
    let table = detector.detect(&mut target).unwrap();
    let hits: Vec<usize> = table.detected().map(|row| row.frame_idx).collect();
    assert_eq!(hits, vec![450]);
}

#[test]
fn windowed_and_bulk_reads_agree() {
    let detector = Detector::new(fade_out_config(0.73), &provider(), grid()).unwrap();
    let bulk = detector.detect(&mut reference_video()).unwrap();
    let windowed = detector
        .detect_with(
            &mut reference_video(),
            &DetectOptions {
                read_mode: ReadMode::Windowed,
                cancel: None,
            },
        )
        .unwrap();
    assert_eq!(bulk, windowed);
    let hits: Vec<usize> = bulk.detected().map(|row| row.frame_idx).collect();
    assert_eq!(hits, vec![90, 180, 270]);
}

#[test]
fn aggregate_embeddings_scan_frame_by_frame() {
    let embedder: Arc<dyn Embedder> = Arc::new(MeanPooled::new(GridEmbedder::default()));
    let detector = Detector::new(fade_in_config(0.95), &provider(), embedder).unwrap();
    assert_eq!(detector.stride(), 1);
    assert_eq!(detector.discriminator().layout(), EmbeddingLayout::Aggregate);

    let mut target = reference_video();
    let table = detector.detect(&mut target).unwrap();
    assert_eq!(table.rows().len(), 359);
    assert_eq!(table.detected().count(), 90);
}

#[test]
fn discriminator_scores_itself_as_identical() {
    let detector = Detector::new(fade_in_config(0.79), &provider(), grid()).unwrap();
    let d = detector.discriminator();
    let score = CosineSimilarity.compute(d, d);
    assert!((score - 1.0).abs() < 1e-4, "{score}");
}
