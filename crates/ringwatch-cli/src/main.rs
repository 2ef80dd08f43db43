//! Ringwatch - find the Olympic rings bumper in a video
//!
//! Downloads the target video, bootstraps fade-in and fade-out detectors from
//! the reference broadcast, and writes per-window predictions as CSV.

use anyhow::{Context as _, Result};
use clap::Parser;
use ringwatch_detect::{
    pair_occurrences, write_occurrences_csv, DetectOptions, DetectionTable, Detector, Embedder,
    GridEmbedder, ReadMode,
};
use ringwatch_media::{ClipWriter, FrameSequence, FrameSource};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod args;
mod config;
mod provider;

use args::Args;
use config::{EmbedderKind, EmbedderSection, RunConfig};
use provider::RemoteVideoProvider;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();

    let mut config = RunConfig::load(args.config.as_deref())?;
    config.apply_args(&args);

    ringwatch_media::init().context("FFmpeg is required to decode videos")?;

    let provider = RemoteVideoProvider::new(&config.raw_dir, config.decode);
    let mut decoder = provider
        .open_decoder(&args.url)
        .with_context(|| format!("Failed to open target video {}", args.url))?;
    let rate = decoder.frame_rate();

    let embedder = build_embedder(&config.embedder)?;
    let fade_in = Detector::new(config.fade_in_config(), &provider, embedder.clone())
        .context("Failed to bootstrap the fade-in detector")?;
    let fade_out = Detector::new(config.fade_out_config(), &provider, embedder)
        .context("Failed to bootstrap the fade-out detector")?;

    if let Some(dir) = &args.dump_references {
        dump_references(dir, &[&fade_in, &fade_out], &provider)?;
    }

    let (fade_in_table, fade_out_table) = if args.windowed {
        info!(frames = decoder.len(), "Scanning target video in windowed mode");
        let options = DetectOptions {
            read_mode: ReadMode::Windowed,
            cancel: None,
        };
        (
            fade_in.detect_with(&mut decoder, &options)?,
            fade_out.detect_with(&mut decoder, &options)?,
        )
    } else {
        // Decode once and share the frames between both detectors.
        let frames = decoder.read_range(0, None)?;
        if frames.len() != decoder.len() {
            warn!(
                reported = decoder.len(),
                decoded = frames.len(),
                "Decoded frame count differs from the container header"
            );
        }
        info!(frames = frames.len(), "Extracted frames from the video");
        let mut target = FrameSequence::new(frames, rate);
        (fade_in.detect(&mut target)?, fade_out.detect(&mut target)?)
    };

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M").to_string();
    for table in [&fade_in_table, &fade_out_table] {
        let path = config.output_dir.join(table.output_file_name(&timestamp));
        table
            .write_csv(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log_summary(table, rate.to_fps_f64());
    }

    let max_gap_frames = (config.max_occurrence_gap_secs * rate.to_fps_f64()).round() as usize;
    let occurrences = pair_occurrences(&fade_in_table, &fade_out_table, max_gap_frames, rate);
    for occurrence in &occurrences {
        info!(
            start = %format!("{:.2}s", occurrence.start_secs),
            end = %format!("{:.2}s", occurrence.end_secs),
            "Olympic rings occurrence"
        );
    }
    let path = config.output_dir.join(format!("{timestamp}_occurrences.csv"));
    write_occurrences_csv(&path, &occurrences)?;
    info!(count = occurrences.len(), "Done");

    Ok(())
}

fn build_embedder(section: &EmbedderSection) -> Result<Arc<dyn Embedder>> {
    match section.kind {
        EmbedderKind::Grid => Ok(Arc::new(GridEmbedder::new(section.grid)?)),
        #[cfg(feature = "onnx")]
        EmbedderKind::Clip => {
            use ringwatch_detect::{ClipConfig, ClipEmbedder, ModelManager};
            let clip = ClipConfig {
                model_path: section.model_path.clone(),
                batch_size: section.batch_size,
                ..ClipConfig::default()
            };
            Ok(Arc::new(ClipEmbedder::load(clip, &ModelManager::default())?))
        }
        #[cfg(not(feature = "onnx"))]
        EmbedderKind::Clip => anyhow::bail!("the clip embedder needs a build with the `onnx` feature"),
    }
}

fn dump_references(dir: &Path, detectors: &[&Detector], provider: &RemoteVideoProvider) -> Result<()> {
    for detector in detectors {
        for (i, reference) in detector.references().iter().enumerate() {
            let sequence = reference.extract(provider)?;
            let path = dir.join(format!("{}_{i}.mp4", detector.label()));
            ClipWriter::new(&path)
                .write_sequence(&sequence)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), range = %reference.range(), "Dumped reference sequence");
        }
    }
    Ok(())
}

fn log_summary(table: &DetectionTable, fps: f64) {
    let spans = table.spans();
    info!(
        label = table.label(),
        windows = table.rows().len(),
        detected = table.detected().count(),
        spans = spans.len(),
        peak = table.peak().map(|row| row.score).unwrap_or(0.0),
        "Detection summary"
    );
    for span in spans {
        info!(
            label = table.label(),
            start = %format!("{:.2}s", span.start_frame as f64 / fps),
            end = %format!("{:.2}s", span.end_frame as f64 / fps),
            peak = span.peak_score,
            "Detected span"
        );
    }
}
