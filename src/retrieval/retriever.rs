use super::{rank, ScoredEntry};
use crate::corpus::Corpus;
use crate::embedding::Embedder;
use crate::error::{LawDecoderError, Result};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Reject blank queries before any downstream work happens.
pub fn validate_query(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(LawDecoderError::Validation(
            "Missing query parameter".to_string(),
        ));
    }
    Ok(query)
}

/// Embeds queries and ranks the corpus against them.
pub struct Retriever {
    corpus: Arc<Corpus>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    /// The corpus and embedder must agree on dimension.
    pub fn new(corpus: Arc<Corpus>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        if let Some(dim) = corpus.dimension() {
            if dim != embedder.dimensions() {
                return Err(LawDecoderError::Config(format!(
                    "Corpus embeddings have dimension {} but the embedding model produces {}",
                    dim,
                    embedder.dimensions()
                )));
            }
        }
        Ok(Self { corpus, embedder })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Embed the query and return the `top_k` most similar sections.
    ///
    /// An embedder failure or an unusable vector is a retrieval failure;
    /// nothing is ranked in that case.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ScoredEntry>> {
        let query = validate_query(query)?;

        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| LawDecoderError::Retrieval(e.to_string()))?;

        if vector.is_empty() {
            return Err(LawDecoderError::Retrieval(
                "Embedding model returned an empty vector".to_string(),
            ));
        }
        if let Some(dim) = self.corpus.dimension() {
            if vector.len() != dim {
                return Err(LawDecoderError::Retrieval(format!(
                    "Query embedding has dimension {}, corpus has {}",
                    vector.len(),
                    dim
                )));
            }
        }

        let sections = rank(self.corpus.entries(), &vector, top_k);
        debug!("Ranked {} sections", sections.len());
        Ok(sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query() {
        assert_eq!(validate_query("  theft  ").unwrap(), "theft");
        assert!(validate_query("").unwrap_err().is_validation());
        assert!(validate_query(" \n\t").unwrap_err().is_validation());
    }
}
