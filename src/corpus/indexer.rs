//! Offline corpus construction from parsed act files.

use super::{Corpus, CorpusEntry};
use crate::embedding::Embedder;
use crate::error::{LawDecoderError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Maximum number of characters fed to the embedding model per section.
pub const MAX_EMBEDDING_INPUT_CHARS: usize = 1000;

/// A section as produced by the act parser, before embedding.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ParsedSection {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub law_name: Option<String>,
    #[serde(default)]
    pub law_code: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Text the model sees for a section: title and content, truncated.
pub fn embedding_input(title: &str, content: &str) -> String {
    format!("{}. {}", title, content)
        .chars()
        .take(MAX_EMBEDDING_INPUT_CHARS)
        .collect()
}

/// Read every `*.json` file in `dir`, in file name order.
///
/// Each file holds an array of sections. Sections without content are
/// dropped; a missing law name falls back to the file stem.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn read_parsed_dir(dir: &Path) -> Result<Vec<ParsedSection>> {
    if !dir.is_dir() {
        return Err(LawDecoderError::Config(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut sections = Vec::new();
    for file in files {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let raw = std::fs::read_to_string(&file)?;
        let parsed: Vec<ParsedSection> = serde_json::from_str(&raw).map_err(|e| {
            LawDecoderError::Corpus(format!("{}: {}", file.display(), e))
        })?;

        let before = sections.len();
        for mut section in parsed {
            if section.content.trim().is_empty() {
                continue;
            }
            if section.law_name.as_deref().map_or(true, |n| n.trim().is_empty()) {
                section.law_name = Some(stem.clone());
            }
            sections.push(section);
        }
        debug!("{}: {} sections", file.display(), sections.len() - before);
    }

    info!("Read {} sections with content", sections.len());
    Ok(sections)
}

/// Embed parsed sections in batches.
///
/// `on_batch` is called with the number of sections finished so far.
pub async fn embed_sections<F>(
    sections: Vec<ParsedSection>,
    embedder: &dyn Embedder,
    batch_size: usize,
    mut on_batch: F,
) -> Result<Corpus>
where
    F: FnMut(usize),
{
    let batch_size = batch_size.max(1);
    let mut entries = Vec::with_capacity(sections.len());
    let mut position = 0;

    for batch in sections.chunks(batch_size) {
        let texts: Vec<String> = batch
            .iter()
            .map(|s| embedding_input(&s.title, &s.content))
            .collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != batch.len() {
            return Err(LawDecoderError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        for (section, embedding) in batch.iter().zip(embeddings) {
            let law_code = section
                .law_code
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "UNKNOWN".to_string());
            let id = section
                .id
                .clone()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("{}-{}", law_code, position));
            entries.push(CorpusEntry {
                id,
                law_name: section.law_name.clone().unwrap_or_default(),
                law_code,
                chapter: section.chapter.clone().filter(|c| !c.trim().is_empty()),
                title: section.title.clone(),
                content: section.content.clone(),
                embedding,
            });
            position += 1;
        }
        on_batch(entries.len());
    }

    Corpus::new(entries)
}

/// Write the corpus as a JSON array of entries with dense embeddings.
pub fn write_corpus(path: &Path, corpus: &Corpus) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if corpus.is_empty() {
        warn!("Writing an empty corpus to {}", path.display());
    }
    let json = serde_json::to_string(corpus.entries())?;
    std::fs::write(path, json)?;
    info!("Wrote {} entries to {}", corpus.len(), path.display());
    Ok(())
}
