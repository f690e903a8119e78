use super::{cosine_similarity, ScoredEntry};
use crate::corpus::CorpusEntry;

/// Number of sections returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 5;

/// Score every entry against `query` and return the `top_k` best, highest first.
///
/// Linear in corpus size times dimension. The sort is stable, so entries with
/// equal scores keep their corpus order. Only the returned entries are cloned.
pub fn rank(corpus: &[CorpusEntry], query: &[f32], top_k: usize) -> Vec<ScoredEntry> {
    let mut scored: Vec<(usize, f32)> = corpus
        .iter()
        .enumerate()
        .map(|(index, entry)| (index, cosine_similarity(&entry.embedding, query)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(index, score)| ScoredEntry {
            entry: corpus[index].clone(),
            score,
        })
        .collect()
}
