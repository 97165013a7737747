//! Embedding reuse keyed by `(content_hash, embedder_id)`.
//!
//! Seeded from a previously saved index, so a rebuild only embeds chunks
//! whose text changed or that the previous model never saw.

use std::collections::HashMap;

use crate::index::VectorIndex;

#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    embedder_id: String,
    vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingCache {
    pub fn new(embedder_id: impl Into<String>) -> Self {
        Self { embedder_id: embedder_id.into(), vectors: HashMap::new() }
    }

    /// Collects the vectors of `index` if it was built by `embedder_id`.
    pub fn from_index(index: &VectorIndex, embedder_id: &str) -> Self {
        let mut cache = Self::new(embedder_id);
        if index.embedder_id() != Some(embedder_id) {
            tracing::debug!(
                previous = index.embedder_id().unwrap_or("-"),
                current = embedder_id,
                "embedder changed, cache not reused"
            );
            return cache;
        }
        for entry in index.entries() {
            if let Some(v) = &entry.vector {
                cache.vectors.entry(entry.content_hash.clone()).or_insert_with(|| v.clone());
            }
        }
        cache
    }

    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    pub fn get(&self, embedder_id: &str, content_hash: &str) -> Option<&Vec<f32>> {
        if embedder_id != self.embedder_id {
            return None;
        }
        self.vectors.get(content_hash)
    }

    pub fn put(&mut self, content_hash: String, vector: Vec<f32>) {
        self.vectors.insert(content_hash, vector);
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
