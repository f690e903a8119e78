//! Similarity ranking of corpus sections against a query vector.

mod ranker;
mod retriever;

pub use ranker::{rank, DEFAULT_TOP_K};
pub use retriever::{validate_query, Retriever};

use crate::corpus::CorpusEntry;
use serde::Serialize;

/// A corpus entry annotated with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntry {
    #[serde(flatten)]
    pub entry: CorpusEntry,
    /// Cosine similarity, in [-1, 1].
    pub score: f32,
}

/// Compute cosine similarity between two vectors.
///
/// Neither vector is assumed to be normalized. Mismatched lengths,
/// zero-magnitude vectors and values that overflow to a non-finite score all
/// score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot_product / (norm_a * norm_b);
    // Also folds -0.0 into 0.0 so orthogonal entries tie under `total_cmp`.
    if !score.is_finite() || score == 0.0 {
        return 0.0;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_ignores_magnitude() {
        let a = vec![2.0, 0.0];
        let b = vec![0.5, 0.5];
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!((cosine_similarity(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let vectors = [
            vec![0.3, -1.2, 4.0, 0.0],
            vec![1.0, 1.0, 1.0, 1.0],
            vec![-0.7, 2.5, 0.1, 9.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ];
        for a in &vectors {
            for b in &vectors {
                assert_eq!(cosine_similarity(a, b), cosine_similarity(b, a));
            }
        }
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::MAX, f32::MAX], &[1.0, 1.0]), 0.0);
    }
}
