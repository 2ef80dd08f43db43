//! The detector: bootstrap a discriminator from reference occurrences, then
//! scan a target video in non-overlapping windows.
//!
//! Windows start at `0, s, 2s, ...` where `s` is the discriminator's frame
//! count. A video of `len <= s + 1` frames yields no windows; otherwise there
//! are `floor((len - s - 1) / s) + 1` of them. A trailing partial window is
//! dropped, as is a pattern that straddles two windows.

use crate::embedder::Embedder;
use crate::embedding::Embedding;
use crate::error::{DetectError, DetectResult};
use crate::metric::{CosineSimilarity, Metric};
use crate::reference::{ReferenceSequence, VideoProvider};
use crate::report::{DetectionRow, DetectionTable};
use ringwatch_core::frame_budget::BULK_READ_WARN_BYTES;
use ringwatch_core::{FrameBuffer, RationalTime};
use ringwatch_media::FrameSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to look for and how strictly.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Name used in logs and output file names, e.g. `fade_in`.
    pub label: String,
    /// Identity (URL or path) of the video holding the reference occurrences.
    pub source: String,
    /// Start of each reference occurrence in `source`.
    pub start_times: Vec<RationalTime>,
    /// Length of every reference occurrence.
    pub sequence_duration: RationalTime,
    /// A window is detected when its score is strictly above this.
    pub threshold: f32,
}

impl DetectorConfig {
    /// Reject configurations that cannot produce a discriminator.
    pub fn validate(&self) -> DetectResult<()> {
        if self.start_times.is_empty() {
            return Err(DetectError::Config(format!(
                "{}: no reference start times configured",
                self.label
            )));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(DetectError::Config(format!(
                "{}: threshold must be positive and finite, got {}",
                self.label, self.threshold
            )));
        }
        if self.sequence_duration.is_negative() || self.sequence_duration.is_zero() {
            return Err(DetectError::Config(format!(
                "{}: sequence duration must be positive, got {}",
                self.label, self.sequence_duration
            )));
        }
        if let Some(start) = self.start_times.iter().find(|t| t.is_negative()) {
            return Err(DetectError::Config(format!(
                "{}: reference start {} is before zero",
                self.label, start
            )));
        }
        Ok(())
    }

    /// One reference sequence per configured start time.
    pub fn references(&self) -> DetectResult<Vec<ReferenceSequence>> {
        self.start_times
            .iter()
            .map(|&start| {
                ReferenceSequence::starting_at(start, self.sequence_duration, self.source.as_str())
            })
            .collect()
    }
}

/// How the target video is read during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Decode the whole video once, then slice windows from memory.
    #[default]
    Bulk,
    /// Decode one window at a time.
    Windowed,
}

/// Handle for cancelling a scan between windows.
#[derive(Debug, Clone)]
pub struct DetectCancel(Arc<AtomicBool>);

impl DetectCancel {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for DetectCancel {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-scan settings for [`Detector::detect_with`].
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    pub read_mode: ReadMode,
    /// Checked before each window is scored.
    pub cancel: Option<DetectCancel>,
}

impl DetectOptions {
    fn check_cancelled(&self) -> DetectResult<()> {
        match &self.cancel {
            Some(cancel) if cancel.is_cancelled() => Err(DetectError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Start indices of every full window scored on a video of `len` frames.
pub fn window_starts(len: usize, stride: usize) -> impl Iterator<Item = usize> {
    let stride = stride.max(1);
    let last = if len > stride + 1 { Some(len - stride - 1) } else { None };
    (0..)
        .step_by(stride)
        .take_while(move |&start| last.is_some_and(|last| start <= last))
}

/// Embed every reference occurrence and average them into one discriminator.
///
/// All reference embeddings must share one shape.
pub fn bootstrap(
    references: &[ReferenceSequence],
    provider: &dyn VideoProvider,
    embedder: &dyn Embedder,
) -> DetectResult<Embedding> {
    if references.is_empty() {
        return Err(DetectError::Config("no reference sequences to bootstrap from".into()));
    }

    let mut embeddings = Vec::with_capacity(references.len());
    for reference in references {
        let sequence = reference.extract(provider)?;
        let embedding = embedder.embed(sequence.frames())?;
        debug!(
            range = %reference.range(),
            shape = %embedding.describe(),
            "Embedded reference sequence"
        );
        embeddings.push(embedding);
    }

    let discriminator = Embedding::mean_of(&embeddings)?;
    info!(
        references = references.len(),
        embedder = embedder.name(),
        shape = %discriminator.describe(),
        "Discriminator embedding bootstrapped"
    );
    Ok(discriminator)
}

/// Scores windows of a target video against a bootstrapped discriminator.
pub struct Detector {
    config: DetectorConfig,
    references: Vec<ReferenceSequence>,
    embedder: Arc<dyn Embedder>,
    metric: Box<dyn Metric>,
    discriminator: Embedding,
}

impl Detector {
    /// Validate `config` and bootstrap the discriminator from `provider`.
    pub fn new(
        config: DetectorConfig,
        provider: &dyn VideoProvider,
        embedder: Arc<dyn Embedder>,
    ) -> DetectResult<Self> {
        Self::with_metric(config, provider, embedder, Box::new(CosineSimilarity))
    }

    /// Like [`Detector::new`], scoring windows with `metric`.
    pub fn with_metric(
        config: DetectorConfig,
        provider: &dyn VideoProvider,
        embedder: Arc<dyn Embedder>,
        metric: Box<dyn Metric>,
    ) -> DetectResult<Self> {
        config.validate()?;
        let references = config.references()?;
        info!(
            label = %config.label,
            references = references.len(),
            threshold = config.threshold,
            metric = metric.name(),
            "Bootstrapping detector"
        );
        let discriminator = bootstrap(&references, provider, embedder.as_ref())?;
        Ok(Self {
            config,
            references,
            embedder,
            metric,
            discriminator,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Label written into result tables and file names.
    pub fn label(&self) -> &str {
        &self.config.label
    }

    /// Scores strictly above this are detections.
    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    /// Reference occurrences the discriminator was built from.
    pub fn references(&self) -> &[ReferenceSequence] {
        &self.references
    }

    /// Mean embedding of the references.
    pub fn discriminator(&self) -> &Embedding {
        &self.discriminator
    }

    /// Window length in frames.
    pub fn stride(&self) -> usize {
        self.discriminator.stride()
    }

    /// Scan `video` with a single bulk read.
    pub fn detect(&self, video: &mut dyn FrameSource) -> DetectResult<DetectionTable> {
        self.detect_with(video, &DetectOptions::default())
    }

    /// Scan `video` with an explicit read mode and optional cancellation.
    ///
    /// A window whose embedding does not match the discriminator's shape
    /// aborts the scan with [`DetectError::ShapeMismatch`].
    pub fn detect_with(
        &self,
        video: &mut dyn FrameSource,
        options: &DetectOptions,
    ) -> DetectResult<DetectionTable> {
        let stride = self.stride();
        let rows = match options.read_mode {
            ReadMode::Bulk => self.scan_bulk(video, stride, options)?,
            ReadMode::Windowed => self.scan_windowed(video, stride, options)?,
        };

        let table = DetectionTable::new(
            self.config.label.clone(),
            self.config.threshold,
            stride,
            rows,
        );
        info!(
            label = %self.config.label,
            windows = table.rows().len(),
            detected = table.detected().count(),
            "Detection finished"
        );
        Ok(table)
    }

    fn scan_bulk(
        &self,
        video: &mut dyn FrameSource,
        stride: usize,
        options: &DetectOptions,
    ) -> DetectResult<Vec<DetectionRow>> {
        let reported = video.len();
        let decoded = match video.as_frames() {
            Some(_) => None,
            None => Some(video.read_range(0, None)?),
        };
        let frames: &[FrameBuffer] = match &decoded {
            Some(frames) => frames.as_slice(),
            None => video.as_frames().unwrap_or_default(),
        };
        if frames.len() != reported {
            warn!(
                reported,
                decoded = frames.len(),
                "Decoded frame count differs from reported length, using decoded count"
            );
        }
        let bytes: usize = frames.iter().map(FrameBuffer::memory_size).sum();
        if bytes > BULK_READ_WARN_BYTES {
            warn!(
                frames = frames.len(),
                mb = bytes / (1024 * 1024),
                "Bulk read holds a large amount of decoded video, consider windowed reads"
            );
        }
        info!(frames = frames.len(), stride, "Scanning target video");

        let mut rows = Vec::new();
        for start in window_starts(frames.len(), stride) {
            options.check_cancelled()?;
            rows.push(self.score_window(start, &frames[start..start + stride])?);
        }
        Ok(rows)
    }

    fn scan_windowed(
        &self,
        video: &mut dyn FrameSource,
        stride: usize,
        options: &DetectOptions,
    ) -> DetectResult<Vec<DetectionRow>> {
        let len = video.len();
        if len == 0 {
            warn!("Video reports no frame count, falling back to a bulk read");
            return self.scan_bulk(video, stride, options);
        }
        info!(frames = len, stride, "Scanning target video window by window");

        let mut rows = Vec::new();
        for start in window_starts(len, stride) {
            options.check_cancelled()?;
            let window = video.read_range(start, Some(start + stride))?;
            if window.len() < stride {
                warn!(
                    start,
                    decoded = window.len(),
                    "Video ended before its reported length, stopping scan"
                );
                break;
            }
            rows.push(self.score_window(start, &window)?);
        }
        Ok(rows)
    }

    fn score_window(&self, start: usize, frames: &[FrameBuffer]) -> DetectResult<DetectionRow> {
        let embedding = self.embedder.embed(frames)?;
        self.discriminator.ensure_compatible(&embedding)?;
        let score = self.metric.compute(&embedding, &self.discriminator);
        let row = DetectionRow::new(start, score, self.config.threshold);
        debug!(frame_idx = start, score, detect = row.detect, "Scored window");
        Ok(row)
    }
}
