//! Similarity metrics between embeddings.
//!
//! Two cosine conventions exist: a plain vector cosine for aggregate
//! embeddings and a pairwise-mean cosine for per-frame stacks.
//! [`CosineSimilarity`] picks between them from the embedding layout.

use crate::embedding::{Embedding, EmbeddingLayout};
use ndarray::{Array2, ArrayView2, Axis};

/// Added to row norms before normalising per-frame stacks.
pub const NORM_EPSILON: f32 = 1e-8;

/// Scores two embeddings for likeness. Pure and symmetric.
pub trait Metric: Send + Sync {
    fn compute(&self, a: &Embedding, b: &Embedding) -> f32;

    fn name(&self) -> &'static str;
}

/// Cosine similarity of the flattened embeddings. Returns 0 when either is zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorCosine;

impl Metric for VectorCosine {
    fn compute(&self, a: &Embedding, b: &Embedding) -> f32 {
        let a = a.data();
        let b = b.data();
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let mut dot = 0.0_f32;
        let mut norm_a = 0.0_f32;
        let mut norm_b = 0.0_f32;
        for (x, y) in a.iter().zip(b.iter()) {
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "vector_cosine"
    }
}

/// Mean of the full cosine matrix between every row of `a` and every row of `b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseMeanCosine;

fn normalize_rows(m: ArrayView2<'_, f32>) -> Array2<f32> {
    let norms = m
        .map_axis(Axis(1), |row| row.dot(&row).sqrt() + NORM_EPSILON)
        .insert_axis(Axis(1));
    &m / &norms
}

impl Metric for PairwiseMeanCosine {
    fn compute(&self, a: &Embedding, b: &Embedding) -> f32 {
        let a = a.data();
        let b = b.data();
        if a.ncols() != b.ncols() || a.nrows() == 0 || b.nrows() == 0 {
            return 0.0;
        }
        let a = normalize_rows(a.view());
        let b = normalize_rows(b.view());
        let similarity = a.dot(&b.t());
        similarity.mean().unwrap_or(0.0).clamp(-1.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "pairwise_mean_cosine"
    }
}

/// Cosine similarity that follows the embedding layout: vector cosine for
/// aggregate embeddings, pairwise-mean cosine for per-frame stacks.
///
/// Callers must not mix layouts; the detector checks shapes before scoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl Metric for CosineSimilarity {
    fn compute(&self, a: &Embedding, b: &Embedding) -> f32 {
        match (a.layout(), b.layout()) {
            (EmbeddingLayout::PerFrame, EmbeddingLayout::PerFrame) => {
                PairwiseMeanCosine.compute(a, b)
            }
            _ => VectorCosine.compute(a, b),
        }
    }

    fn name(&self) -> &'static str {
        "cosine_similarity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn agg(v: &[f32]) -> Embedding {
        Embedding::aggregate(v.to_vec())
    }

    #[test]
    fn test_vector_identical() {
        let a = agg(&[1.0, 2.0, 3.0]);
        assert!((VectorCosine.compute(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vector_orthogonal_and_opposite() {
        assert!(VectorCosine.compute(&agg(&[1.0, 0.0]), &agg(&[0.0, 1.0])).abs() < 1e-6);
        let score = VectorCosine.compute(&agg(&[1.0, 2.0]), &agg(&[-1.0, -2.0]));
        assert!((score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_vector_zero_is_zero() {
        let zero = agg(&[0.0, 0.0, 0.0]);
        assert_eq!(VectorCosine.compute(&zero, &agg(&[1.0, 2.0, 3.0])), 0.0);
        assert_eq!(VectorCosine.compute(&zero, &zero), 0.0);
    }

    #[test]
    fn test_pairwise_identical_constant_stack() {
        let a = Embedding::per_frame(vec![vec![0.3, -0.2, 0.9]; 30]).unwrap();
        assert!((PairwiseMeanCosine.compute(&a, &a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_pairwise_averages_every_pair() {
        let a = Embedding::per_frame(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let b = Embedding::per_frame(vec![vec![1.0, 0.0]]).unwrap();
        // pairs: (e1,e1)=1, (e2,e1)=0
        assert!((PairwiseMeanCosine.compute(&a, &b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_pairwise_zero_rows_do_not_divide_by_zero() {
        let a = Embedding::per_frame(vec![vec![0.0, 0.0]; 2]).unwrap();
        let b = Embedding::per_frame(vec![vec![1.0, 1.0]; 2]).unwrap();
        let score = PairwiseMeanCosine.compute(&a, &b);
        assert!(score.is_finite());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_dispatch_on_layout() {
        let a = Embedding::per_frame(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let b = Embedding::per_frame(vec![vec![1.0, 0.0], vec![1.0, 0.0]]).unwrap();
        assert_eq!(
            CosineSimilarity.compute(&a, &b),
            PairwiseMeanCosine.compute(&a, &b)
        );
        let x = agg(&[1.0, 2.0]);
        let y = agg(&[2.0, 1.0]);
        assert_eq!(CosineSimilarity.compute(&x, &y), VectorCosine.compute(&x, &y));
    }

    fn vector() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-100.0f32..100.0, 16)
    }

    proptest! {
        #[test]
        fn prop_vector_in_range(a in vector(), b in vector()) {
            let s = VectorCosine.compute(&agg(&a), &agg(&b));
            prop_assert!((-1.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_vector_symmetric(a in vector(), b in vector()) {
            let ab = VectorCosine.compute(&agg(&a), &agg(&b));
            let ba = VectorCosine.compute(&agg(&b), &agg(&a));
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn prop_vector_self_similarity(a in vector()) {
            prop_assume!(a.iter().map(|x| x * x).sum::<f32>() > 1e-3);
            let s = VectorCosine.compute(&agg(&a), &agg(&a));
            prop_assert!((s - 1.0).abs() < 1e-4);
        }

        #[test]
        fn prop_pairwise_in_range(a in prop::collection::vec(vector(), 1..6),
                                  b in prop::collection::vec(vector(), 1..6)) {
            let a = Embedding::per_frame(a).unwrap();
            let b = Embedding::per_frame(b).unwrap();
            let s = PairwiseMeanCosine.compute(&a, &b);
            prop_assert!((-1.0..=1.0).contains(&s));
            let t = PairwiseMeanCosine.compute(&b, &a);
            prop_assert!((s - t).abs() < 1e-5);
        }
    }
}
