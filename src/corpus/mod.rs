//! Precomputed statute corpus.
//!
//! The corpus is produced offline (see `lawdecoder index`), loaded once at
//! startup and never mutated afterwards, so it can be shared as `Arc<Corpus>`
//! between concurrent queries without locking.

mod indexer;
mod loader;

pub use indexer::{
    embed_sections, embedding_input, read_parsed_dir, write_corpus, ParsedSection,
    MAX_EMBEDDING_INPUT_CHARS,
};
pub use loader::{load_corpus, RawEmbedding, RawRecord};

use serde::{Deserialize, Serialize};

/// A single statute section with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusEntry {
    /// Stable identifier of the section.
    pub id: String,
    /// Name of the act the section comes from.
    pub law_name: String,
    /// Short act code (e.g. "BNSS").
    pub law_code: String,
    /// Chapter heading, when the act is divided into chapters.
    pub chapter: Option<String>,
    /// Section title as labeled in the act.
    pub title: String,
    /// Full section text.
    pub content: String,
    /// Dense embedding vector.
    pub embedding: Vec<f32>,
}

/// The in-memory corpus.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    dimension: Option<usize>,
}

impl Corpus {
    /// Build a corpus from entries, checking that every embedding has the same dimension.
    pub fn new(entries: Vec<CorpusEntry>) -> crate::error::Result<Self> {
        let dimension = entries.first().map(|e| e.embedding.len());

        if let Some(dim) = dimension {
            if dim == 0 {
                return Err(crate::error::LawDecoderError::Corpus(format!(
                    "entry '{}' has an empty embedding",
                    entries[0].id
                )));
            }
            if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dim) {
                return Err(crate::error::LawDecoderError::Corpus(format!(
                    "entry '{}' has dimension {}, expected {}",
                    bad.id,
                    bad.embedding.len(),
                    dim
                )));
            }
        }

        Ok(Self { entries, dimension })
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// Embedding dimension shared by every entry, or `None` for an empty corpus.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_entry(id: &str, title: &str, embedding: Vec<f32>) -> CorpusEntry {
    CorpusEntry {
        id: id.to_string(),
        law_name: "The Bharatiya Nagarik Suraksha Sanhita, 2023".to_string(),
        law_code: "BNSS".to_string(),
        chapter: None,
        title: title.to_string(),
        content: format!("{} content", title),
        embedding,
    }
}
