//! Turning frame windows into embeddings.
//!
//! [`GridEmbedder`] needs no model and is deterministic, which makes it the
//! default for tests and for quick runs. The CLIP encoder lives in
//! [`crate::clip`] behind the `onnx` feature.

use crate::embedding::{Embedding, EmbeddingLayout};
use crate::error::{DetectError, DetectResult};
use ndarray::Axis;
use ringwatch_core::FrameBuffer;
use serde::{Deserialize, Serialize};

/// Produces a fixed-shape embedding for an ordered window of frames.
///
/// Implementations must be deterministic for identical input frames.
pub trait Embedder: Send + Sync {
    fn embed(&self, frames: &[FrameBuffer]) -> DetectResult<Embedding>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed(&self, frames: &[FrameBuffer]) -> DetectResult<Embedding> {
        (**self).embed(frames)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Per-frame embedding made of mean RGB values over a `grid x grid` layout
/// of cells, each channel mapped from `[0, 255]` to `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridEmbedder {
    grid: u32,
}

impl Default for GridEmbedder {
    fn default() -> Self {
        Self { grid: 4 }
    }
}

impl GridEmbedder {
    /// Grid of `grid x grid` cells; zero is rejected.
    pub fn new(grid: u32) -> DetectResult<Self> {
        if grid == 0 {
            return Err(DetectError::Config("grid size must be at least 1".into()));
        }
        Ok(Self { grid })
    }

    pub fn grid(&self) -> u32 {
        self.grid
    }

    /// Length of each frame's vector.
    pub fn dim(&self) -> usize {
        (self.grid * self.grid * 3) as usize
    }

    fn embed_frame(&self, frame: &FrameBuffer) -> DetectResult<Vec<f32>> {
        if frame.width < self.grid || frame.height < self.grid {
            return Err(DetectError::Embedding(format!(
                "{}x{} frame is smaller than a {}x{} grid",
                frame.width, frame.height, self.grid, self.grid
            )));
        }

        let cells = self.grid as usize;
        let mut sums = vec![[0u64; 3]; cells * cells];
        let mut counts = vec![0u64; cells * cells];
        for y in 0..frame.height {
            let cy = (y as usize * cells) / frame.height as usize;
            for x in 0..frame.width {
                let cx = (x as usize * cells) / frame.width as usize;
                let cell = cy * cells + cx;
                let px = frame.pixel_rgb(x, y);
                for (sum, value) in sums[cell].iter_mut().zip(px) {
                    *sum += value as u64;
                }
                counts[cell] += 1;
            }
        }

        let mut vector = Vec::with_capacity(self.dim());
        for (sum, &count) in sums.iter().zip(&counts) {
            for channel in sum {
                let mean = *channel as f32 / count as f32;
                vector.push(mean / 127.5 - 1.0);
            }
        }
        Ok(vector)
    }
}

impl Embedder for GridEmbedder {
    fn embed(&self, frames: &[FrameBuffer]) -> DetectResult<Embedding> {
        if frames.is_empty() {
            return Err(DetectError::Embedding("cannot embed an empty window".into()));
        }
        let rows = frames
            .iter()
            .map(|f| self.embed_frame(f))
            .collect::<DetectResult<Vec<_>>>()?;
        Embedding::per_frame(rows)
    }

    fn name(&self) -> &str {
        "grid"
    }
}

/// Averages the rows of a per-frame embedder into a single aggregate vector.
#[derive(Debug, Clone)]
pub struct MeanPooled<E> {
    inner: E,
    name: String,
}

impl<E: Embedder> MeanPooled<E> {
    /// Wrap a per-frame embedder.
    pub fn new(inner: E) -> Self {
        let name = format!("mean_pooled({})", inner.name());
        Self { inner, name }
    }

    /// The wrapped embedder.
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Embedder> Embedder for MeanPooled<E> {
    fn embed(&self, frames: &[FrameBuffer]) -> DetectResult<Embedding> {
        let stacked = self.inner.embed(frames)?;
        if stacked.layout() == EmbeddingLayout::Aggregate {
            return Ok(stacked);
        }
        let mean = stacked
            .data()
            .mean_axis(Axis(0))
            .ok_or_else(|| DetectError::Embedding("cannot pool an empty embedding".into()))?;
        Ok(Embedding::aggregate(mean.to_vec()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
