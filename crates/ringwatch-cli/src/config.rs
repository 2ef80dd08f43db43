//! Run settings: built-in presets, optionally overridden by a TOML file and
//! then by command-line flags.

use crate::args::Args;
use anyhow::{bail, Context as _, Result};
use ringwatch_core::RationalTime;
use ringwatch_detect::presets::{self, FADE_IN_LABEL, FADE_OUT_LABEL};
use ringwatch_detect::DetectorConfig;
use ringwatch_media::DecodeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    #[default]
    Grid,
    Clip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderSection {
    pub kind: EmbedderKind,
    /// Cells per side for the grid embedder.
    pub grid: u32,
    /// CLIP visual encoder; the model cache is used when unset.
    pub model_path: Option<PathBuf>,
    pub batch_size: usize,
}

impl Default for EmbedderSection {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Grid,
            grid: 4,
            model_path: None,
            batch_size: 16,
        }
    }
}

/// One detector, with times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSection {
    pub start_times_secs: Vec<f64>,
    pub sequence_duration_secs: f64,
    pub threshold: f32,
}

impl DetectorSection {
    fn from_preset(config: &DetectorConfig) -> Self {
        Self {
            start_times_secs: config
                .start_times
                .iter()
                .map(|t| t.to_seconds_f64())
                .collect(),
            sequence_duration_secs: config.sequence_duration.to_seconds_f64(),
            threshold: config.threshold,
        }
    }

    pub fn to_config(&self, label: &str, source: &str) -> DetectorConfig {
        DetectorConfig {
            label: label.to_string(),
            source: source.to_string(),
            start_times: self
                .start_times_secs
                .iter()
                .map(|&s| RationalTime::from_seconds_f64(s))
                .collect(),
            sequence_duration: RationalTime::from_seconds_f64(self.sequence_duration_secs),
            threshold: self.threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Video holding the labeled bumper occurrences.
    pub reference_url: String,
    pub raw_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_occurrence_gap_secs: f64,
    pub decode: DecodeOptions,
    pub embedder: EmbedderSection,
    pub fade_in: DetectorSection,
    pub fade_out: DetectorSection,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            reference_url: presets::REFERENCE_VIDEO_URL.to_string(),
            raw_dir: PathBuf::from("data/raw"),
            output_dir: PathBuf::from("data/embeddings"),
            max_occurrence_gap_secs: presets::MAX_OCCURRENCE_GAP_SECS,
            decode: DecodeOptions::default(),
            embedder: EmbedderSection::default(),
            fade_in: DetectorSection::from_preset(&DetectorConfig::fade_in()),
            fade_out: DetectorSection::from_preset(&DetectorConfig::fade_out()),
        }
    }
}

impl RunConfig {
    /// Defaults, overlaid with `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            bail!("config file {} does not exist", path.display());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn apply_args(&mut self, args: &Args) {
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(dir) = &args.raw_dir {
            self.raw_dir = dir.clone();
        }
        if let Some(threshold) = args.fade_in_threshold {
            self.fade_in.threshold = threshold;
        }
        if let Some(threshold) = args.fade_out_threshold {
            self.fade_out.threshold = threshold;
        }
    }

    pub fn fade_in_config(&self) -> DetectorConfig {
        self.fade_in.to_config(FADE_IN_LABEL, &self.reference_url)
    }

    pub fn fade_out_config(&self) -> DetectorConfig {
        self.fade_out.to_config(FADE_OUT_LABEL, &self.reference_url)
    }
}
