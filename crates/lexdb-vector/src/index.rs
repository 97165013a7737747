use std::collections::HashSet;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use lexdb_core::types::{Chunk, IndexEntry};

const NORM_TOLERANCE: f32 = 1e-3;

/// Immutable snapshot of chunks and their optional vectors.
///
/// Entries keep build order; `chunk_id` is the position in that order and is
/// the tie-breaker for equal scores.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    pub(crate) entries: Vec<IndexEntry>,
    pub(crate) embedder_id: Option<String>,
    pub(crate) dimension: Option<usize>,
    pub(crate) normalized: bool,
    pub(crate) built_at: DateTime<Utc>,
}

impl VectorIndex {
    /// Index with no entries. Queries against it report `IndexNotLoaded`.
    pub fn empty() -> Self {
        Self::without_vectors(Vec::new())
    }

    fn without_vectors(entries: Vec<IndexEntry>) -> Self {
        Self {
            entries,
            embedder_id: None,
            dimension: None,
            normalized: false,
            built_at: Utc::now(),
        }
    }

    /// Builds a snapshot from chunks and, optionally, one vector per chunk.
    ///
    /// All vectors must share one non-zero dimension and be finite.
    pub fn build(
        chunks: Vec<Chunk>,
        vectors: Option<Vec<Vec<f32>>>,
        embedder_id: Option<String>,
    ) -> Result<Self> {
        let Some(vectors) = vectors else {
            let entries = chunks
                .into_iter()
                .enumerate()
                .map(|(id, chunk)| new_entry(id, chunk, None))
                .collect();
            return Ok(Self::without_vectors(entries));
        };
        if vectors.len() != chunks.len() {
            bail!("{} vectors for {} chunks", vectors.len(), chunks.len());
        }
        let dimension = vectors.first().map(Vec::len);
        if let Some(dim) = dimension {
            if dim == 0 {
                bail!("zero-dimensional vectors");
            }
            if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
                bail!("vector {} has dimension {}, expected {}", i, v.len(), dim);
            }
            if vectors.iter().flatten().any(|x| !x.is_finite()) {
                bail!("vectors contain non-finite values");
            }
        }
        let normalized = !vectors.is_empty() && vectors.iter().all(|v| is_unit(v));
        let entries = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(id, (chunk, vector))| new_entry(id, chunk, Some(vector)))
            .collect();
        Ok(Self { entries, embedder_id, dimension, normalized, built_at: Utc::now() })
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Candidate set for a query. Scoring is exhaustive, so this is every
    /// entry and top-k over it is exact.
    pub fn candidates(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every entry carries a vector.
    pub fn has_vectors(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.vector.is_some())
    }

    /// Number of distinct source documents.
    pub fn documents(&self) -> usize {
        self.entries.iter().map(|e| e.chunk.title.as_str()).collect::<HashSet<_>>().len()
    }

    pub fn embedder_id(&self) -> Option<&str> {
        self.embedder_id.as_deref()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Whether all vectors have unit L2 norm, so dot product equals cosine.
    pub fn normalized(&self) -> bool {
        self.normalized
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

fn new_entry(chunk_id: usize, chunk: Chunk, vector: Option<Vec<f32>>) -> IndexEntry {
    let content_hash = content_hash(&chunk.text);
    IndexEntry { chunk_id, chunk, content_hash, vector }
}

fn is_unit(v: &[f32]) -> bool {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    (norm - 1.0).abs() <= NORM_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(title: &str, seq: usize, text: &str) -> Chunk {
        Chunk { title: title.into(), source_file: None, seq, start: 0, text: text.into() }
    }

    #[test]
    fn build_without_vectors_keeps_order() {
        let chunks = vec![chunk("ipc", 0, "a"), chunk("ipc", 1, "b"), chunk("ica", 0, "c")];
        let idx = VectorIndex::build(chunks, None, None).unwrap();
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.documents(), 2);
        assert!(!idx.has_vectors());
        let ids: Vec<usize> = idx.candidates().iter().map(|e| e.chunk_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(idx.entries()[1].content_hash, content_hash("b"));
    }

    #[test]
    fn build_with_vectors_records_dimension_and_normalization() {
        let idx = VectorIndex::build(
            vec![chunk("ipc", 0, "a"), chunk("ipc", 1, "b")],
            Some(vec![vec![1.0, 0.0], vec![0.6, 0.8]]),
            Some("hash:test".into()),
        )
        .unwrap();
        assert!(idx.has_vectors());
        assert_eq!(idx.dimension(), Some(2));
        assert!(idx.normalized());
        assert_eq!(idx.embedder_id(), Some("hash:test"));
    }

    #[test]
    fn build_rejects_inconsistent_vectors() {
        let chunks = vec![chunk("ipc", 0, "a"), chunk("ipc", 1, "b")];
        assert!(VectorIndex::build(chunks.clone(), Some(vec![vec![1.0]]), None).is_err());
        let ragged = vec![vec![1.0], vec![1.0, 0.0]];
        assert!(VectorIndex::build(chunks.clone(), Some(ragged), None).is_err());
        assert!(VectorIndex::build(chunks, Some(vec![vec![f32::NAN], vec![1.0]]), None).is_err());
    }

    #[test]
    fn empty_index_reports_nothing() {
        let idx = VectorIndex::empty();
        assert!(idx.is_empty());
        assert!(!idx.has_vectors());
        assert_eq!(idx.documents(), 0);
    }
}
