//! Detection result table and CSV output.

use crate::error::DetectResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Score for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionRow {
    /// Index of the window's first frame.
    pub frame_idx: usize,
    pub score: f32,
    pub detect: bool,
}

impl DetectionRow {
    /// A row is detected only when `score` is strictly above `threshold`.
    pub fn new(frame_idx: usize, score: f32, threshold: f32) -> Self {
        Self {
            frame_idx,
            score,
            detect: score > threshold,
        }
    }
}

/// A run of adjacent detected windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSpan {
    pub start_frame: usize,
    /// Exclusive.
    pub end_frame: usize,
    pub peak_score: f32,
}

impl DetectionSpan {
    /// Length in frames.
    pub fn len(&self) -> usize {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.end_frame == self.start_frame
    }
}

/// All window scores from one detector run, in ascending `frame_idx` order.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionTable {
    label: String,
    threshold: f32,
    stride: usize,
    rows: Vec<DetectionRow>,
}

impl DetectionTable {
    /// Table of `rows` scored with `stride` frame windows.
    pub fn new(label: impl Into<String>, threshold: f32, stride: usize, rows: Vec<DetectionRow>) -> Self {
        Self {
            label: label.into(),
            threshold,
            stride,
            rows,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// One row per window, in frame order.
    pub fn rows(&self) -> &[DetectionRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same scores under a different threshold.
    pub fn relabel(&self, threshold: f32) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| DetectionRow::new(row.frame_idx, row.score, threshold))
            .collect();
        Self {
            label: self.label.clone(),
            threshold,
            stride: self.stride,
            rows,
        }
    }

    /// Rows whose score passed the threshold.
    pub fn detected(&self) -> impl Iterator<Item = &DetectionRow> + '_ {
        self.rows.iter().filter(|row| row.detect)
    }

    /// Highest scoring row, if any.
    pub fn peak(&self) -> Option<&DetectionRow> {
        self.rows
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }

    /// Merge detected windows that touch into spans.
    pub fn spans(&self) -> Vec<DetectionSpan> {
        let mut spans: Vec<DetectionSpan> = Vec::new();
        for row in self.detected() {
            let end = row.frame_idx + self.stride;
            match spans.last_mut() {
                Some(span) if span.end_frame == row.frame_idx => {
                    span.end_frame = end;
                    span.peak_score = span.peak_score.max(row.score);
                }
                _ => spans.push(DetectionSpan {
                    start_frame: row.frame_idx,
                    end_frame: end,
                    peak_score: row.score,
                }),
            }
        }
        spans
    }

    /// `<timestamp>_<label>_predictions.csv`
    pub fn output_file_name(&self, timestamp: &str) -> String {
        format!("{timestamp}_{}_predictions.csv", self.label)
    }

    /// Write `frame_idx,score,detect` rows, creating parent directories.
    pub fn write_csv(&self, path: &Path) -> DetectResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        info!(
            label = %self.label,
            rows = self.rows.len(),
            path = %path.display(),
            "Wrote detection table"
        );
        Ok(())
    }

    /// Read rows written by [`write_csv`](Self::write_csv).
    pub fn read_csv(
        path: &Path,
        label: impl Into<String>,
        threshold: f32,
        stride: usize,
    ) -> DetectResult<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<DetectionRow>, _>>()?;
        Ok(Self::new(label, threshold, stride, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(scores: &[f32], threshold: f32) -> DetectionTable {
        let rows = scores
            .iter()
            .enumerate()
            .map(|(i, &s)| DetectionRow::new(i * 30, s, threshold))
            .collect();
        DetectionTable::new("fade_in", threshold, 30, rows)
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(!DetectionRow::new(0, 0.79, 0.79).detect);
        assert!(DetectionRow::new(0, 0.7901, 0.79).detect);
    }

    #[test]
    fn test_relabel_keeps_scores() {
        let strict = table(&[0.2, 0.75, 0.8, 0.74], 0.79);
        let loose = strict.relabel(0.73);
        assert_eq!(strict.detected().count(), 1);
        assert_eq!(loose.detected().count(), 3);
        for (a, b) in strict.rows().iter().zip(loose.rows()) {
            assert_eq!(a.frame_idx, b.frame_idx);
            assert_eq!(a.score, b.score);
        }
        assert_eq!(loose.threshold(), 0.73);
    }

    #[test]
    fn test_spans_merge_adjacent_windows() {
        let t = table(&[0.9, 0.95, 0.1, 0.1, 0.85, 0.1], 0.8);
        let spans = t.spans();
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start_frame, spans[0].end_frame), (0, 60));
        assert_eq!(spans[0].peak_score, 0.95);
        assert_eq!((spans[1].start_frame, spans[1].end_frame), (120, 150));
        assert_eq!(spans[1].len(), 30);
    }

    #[test]
    fn test_peak() {
        let t = table(&[0.1, 0.6, 0.3], 0.5);
        assert_eq!(t.peak().map(|r| r.frame_idx), Some(30));
        assert!(table(&[], 0.5).peak().is_none());
    }

    #[test]
    fn test_output_file_name() {
        let t = table(&[], 0.79);
        assert_eq!(
            t.output_file_name("20240301_1530"),
            "20240301_1530_fade_in_predictions.csv"
        );
    }

    #[test]
    fn test_csv_columns_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("table.csv");
        let t = table(&[0.5, 0.9], 0.8);
        t.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("frame_idx,score,detect"));
        assert_eq!(lines.next(), Some("0,0.5,false"));
        assert_eq!(lines.next(), Some("30,0.9,true"));

        let reloaded = DetectionTable::read_csv(&path, "fade_in", 0.8, 30).unwrap();
        assert_eq!(reloaded, t);
    }
}
