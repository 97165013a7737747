//! Loader for the simple keyword store used when no index can be loaded.
//!
//! ```json
//! { "metadata": { ... },
//!   "documents": { "Indian Penal Code": { "content": "...", "source_file": "..." } } }
//! ```
//! Documents are taken in name order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use lexdb_core::chunker::Chunker;
use lexdb_core::error::{Error, Result};
use lexdb_core::types::Document;
use serde::Deserialize;

use crate::index::VectorIndex;

#[derive(Debug, Deserialize)]
struct KnowledgeBaseFile {
    documents: BTreeMap<String, KnowledgeBaseDocument>,
}

#[derive(Debug, Deserialize)]
struct KnowledgeBaseDocument {
    content: String,
    #[serde(default)]
    source_file: Option<String>,
}

pub fn load_knowledge_base(path: &Path) -> Result<Vec<Document>> {
    if !path.exists() {
        return Err(Error::NotFound(path.display().to_string()));
    }
    let raw = fs::read_to_string(path)?;
    let file: KnowledgeBaseFile =
        serde_json::from_str(&raw).map_err(|e| Error::corrupt_index(path, e))?;
    let docs = file
        .documents
        .into_iter()
        .filter(|(_, d)| !d.content.trim().is_empty())
        .map(|(name, d)| {
            let doc = Document::new(name, d.content);
            match d.source_file {
                Some(f) => doc.with_source_file(f),
                None => doc,
            }
        })
        .collect();
    Ok(docs)
}

/// Chunks the knowledge base into a keyword-only index.
pub fn knowledge_base_index(path: &Path, chunker: &Chunker) -> Result<VectorIndex> {
    let docs = load_knowledge_base(path)?;
    let chunks = chunker.chunk_all(&docs);
    let index = VectorIndex::build(chunks, None, None).map_err(|e| Error::corrupt_index(path, e))?;
    tracing::info!(
        path = %path.display(),
        documents = docs.len(),
        chunks = index.len(),
        "knowledge base loaded"
    );
    Ok(index)
}
