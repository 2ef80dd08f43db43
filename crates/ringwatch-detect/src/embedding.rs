//! Embedding values produced for a window of frames.

use crate::error::{DetectError, DetectResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// How the rows of an embedding relate to the frames that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbeddingLayout {
    /// One row describing the whole window (shape `1 x D`).
    Aggregate,
    /// One row per frame (shape `frames x D`).
    PerFrame,
}

/// A 2-D embedding with a declared layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    data: Array2<f32>,
    layout: EmbeddingLayout,
}

impl Embedding {
    /// Wrap `data`. An aggregate embedding must be a single row.
    pub fn new(data: Array2<f32>, layout: EmbeddingLayout) -> DetectResult<Self> {
        if layout == EmbeddingLayout::Aggregate && data.nrows() != 1 {
            return Err(DetectError::ShapeMismatch {
                expected: "1 row for an aggregate embedding".into(),
                actual: format!("{} rows", data.nrows()),
            });
        }
        Ok(Self { data, layout })
    }

    /// A `1 x D` aggregate embedding.
    pub fn aggregate(vector: Vec<f32>) -> Self {
        let dim = vector.len();
        Self {
            data: Array2::from_shape_vec((1, dim), vector)
                .unwrap_or_else(|_| Array2::zeros((1, dim))),
            layout: EmbeddingLayout::Aggregate,
        }
    }

    /// A per-frame embedding from equally sized rows.
    pub fn per_frame(rows: Vec<Vec<f32>>) -> DetectResult<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(DetectError::ShapeMismatch {
                expected: format!("rows of width {dim}"),
                actual: format!("row of width {}", bad.len()),
            });
        }
        let n = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((n, dim), flat)
            .map_err(|e| DetectError::Embedding(e.to_string()))?;
        Ok(Self {
            data,
            layout: EmbeddingLayout::PerFrame,
        })
    }

    /// Raw values, one row per frame for per-frame layouts.
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn layout(&self) -> EmbeddingLayout {
        self.layout
    }

    /// `(rows, dim)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Width of each row.
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// Frames per window implied by this embedding, if it is per-frame.
    pub fn frame_count(&self) -> Option<usize> {
        match self.layout {
            EmbeddingLayout::PerFrame => Some(self.data.nrows()),
            EmbeddingLayout::Aggregate => None,
        }
    }

    /// Window length to use when scanning against this embedding.
    pub fn stride(&self) -> usize {
        self.frame_count().unwrap_or(1)
    }

    /// Short description for logs and error messages, e.g. `PerFrame 30x12`.
    pub fn describe(&self) -> String {
        let (rows, cols) = self.shape();
        format!("{:?} {}x{}", self.layout, rows, cols)
    }

    /// Check that `other` can be compared element-wise with `self`.
    pub fn ensure_compatible(&self, other: &Embedding) -> DetectResult<()> {
        if self.layout != other.layout || self.shape() != other.shape() {
            return Err(DetectError::ShapeMismatch {
                expected: self.describe(),
                actual: other.describe(),
            });
        }
        Ok(())
    }

    /// Element-wise mean of several embeddings of identical shape and layout.
    pub fn mean_of(embeddings: &[Embedding]) -> DetectResult<Self> {
        let Some(first) = embeddings.first() else {
            return Err(DetectError::Config(
                "cannot average an empty set of embeddings".into(),
            ));
        };
        let mut sum = first.data.clone();
        for other in &embeddings[1..] {
            first.ensure_compatible(other)?;
            sum += &other.data;
        }
        sum /= embeddings.len() as f32;
        Ok(Self {
            data: sum,
            layout: first.layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_frame_shape() {
        let emb = Embedding::per_frame(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(emb.shape(), (3, 2));
        assert_eq!(emb.frame_count(), Some(3));
        assert_eq!(emb.stride(), 3);
    }

    #[test]
    fn test_aggregate_stride_is_one() {
        let emb = Embedding::aggregate(vec![0.5; 8]);
        assert_eq!(emb.frame_count(), None);
        assert_eq!(emb.stride(), 1);
        assert_eq!(emb.dim(), 8);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Embedding::per_frame(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, DetectError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_mean_of() {
        let a = Embedding::per_frame(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let b = Embedding::per_frame(vec![vec![3.0, 2.0], vec![2.0, 3.0]]).unwrap();
        let mean = Embedding::mean_of(&[a, b]).unwrap();
        assert_eq!(mean.data()[[0, 0]], 2.0);
        assert_eq!(mean.data()[[0, 1]], 1.0);
        assert_eq!(mean.data()[[1, 1]], 2.0);
        assert_eq!(mean.layout(), EmbeddingLayout::PerFrame);
    }

    #[test]
    fn test_mean_of_rejects_mismatch() {
        let a = Embedding::per_frame(vec![vec![1.0, 0.0]; 3]).unwrap();
        let b = Embedding::per_frame(vec![vec![1.0, 0.0]; 2]).unwrap();
        assert!(matches!(
            Embedding::mean_of(&[a.clone(), b]),
            Err(DetectError::ShapeMismatch { .. })
        ));
        let c = Embedding::aggregate(vec![1.0, 0.0]);
        assert!(Embedding::mean_of(&[a, c]).is_err());
        assert!(Embedding::mean_of(&[]).is_err());
    }

    #[test]
    fn test_aggregate_constructor_checks_rows() {
        let data = Array2::zeros((2, 4));
        assert!(Embedding::new(data, EmbeddingLayout::Aggregate).is_err());
    }
}
