//! Loading the vector file written by the offline indexer.
//!
//! Older vector files store each embedding as a serialized typed array, which
//! comes out of JSON as an index-keyed object (`{"0": 0.1, "1": -0.2, ...}`).
//! Every representation is converted into a dense `Vec<f32>` here, once.

use super::{Corpus, CorpusEntry};
use crate::error::{LawDecoderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, instrument, warn};

/// An embedding as it may appear on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEmbedding {
    Dense(Vec<f32>),
    Wrapped { data: Vec<f32> },
    Indexed(HashMap<String, f32>),
}

impl RawEmbedding {
    /// Convert into a dense vector. Index-keyed maps are ordered by numeric key.
    pub fn into_dense(self) -> Result<Vec<f32>> {
        match self {
            RawEmbedding::Dense(values) | RawEmbedding::Wrapped { data: values } => Ok(values),
            RawEmbedding::Indexed(map) => {
                let mut pairs = map
                    .into_iter()
                    .map(|(key, value)| {
                        key.parse::<usize>().map(|index| (index, value)).map_err(|_| {
                            LawDecoderError::Corpus(format!("non-numeric embedding key '{}'", key))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                pairs.sort_by_key(|(index, _)| *index);
                Ok(pairs.into_iter().map(|(_, value)| value).collect())
            }
        }
    }
}

/// A record in the vector file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub law_name: String,
    #[serde(default)]
    pub law_code: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    pub title: String,
    pub content: String,
    pub embedding: RawEmbedding,
}

impl RawRecord {
    fn into_entry(self, position: usize) -> Result<CorpusEntry> {
        let law_code = self
            .law_code
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("{}-{}", law_code, position));

        Ok(CorpusEntry {
            embedding: self.embedding.into_dense()?,
            id,
            law_name: self.law_name,
            law_code,
            chapter: self.chapter.filter(|c| !c.trim().is_empty()),
            title: self.title,
            content: self.content,
        })
    }
}

/// Load the corpus from a JSON vector file.
///
/// A missing file is a configuration error: the service cannot answer
/// anything without it.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_corpus(path: &Path) -> Result<Corpus> {
    if !path.exists() {
        return Err(LawDecoderError::Config(format!(
            "corpus file {} not found; run `lawdecoder index` first",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let records: Vec<RawRecord> = serde_json::from_str(&content)?;

    let entries = records
        .into_iter()
        .enumerate()
        .map(|(position, record)| record.into_entry(position))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.id.as_str()) {
            warn!("Duplicate corpus id: {}", entry.id);
        }
    }

    let corpus = Corpus::new(entries)?;
    if corpus.is_empty() {
        warn!("Corpus is empty; every query will return no sections");
    }
    info!(
        "Loaded {} corpus entries (dimension {:?})",
        corpus.len(),
        corpus.dimension()
    );

    Ok(corpus)
}
