use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use lexdb_core::chunker::Chunker;
use lexdb_core::traits::Embedder;
use lexdb_core::types::{Chunk, Document};

use crate::cache::EmbeddingCache;
use crate::index::{content_hash, VectorIndex};

/// Batch pipeline: documents -> chunks -> (optional) vectors -> index.
///
/// Without an embedder, or if embedding fails part-way, the result is a
/// keyword-only index rather than an error.
pub struct IndexBuilder {
    chunker: Chunker,
    embedder: Option<Arc<dyn Embedder>>,
    batch_size: usize,
    show_progress: bool,
    cache: Option<EmbeddingCache>,
}

impl IndexBuilder {
    pub fn new(chunker: Chunker) -> Self {
        Self { chunker, embedder: None, batch_size: 32, show_progress: false, cache: None }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Reuses vectors from `previous` where content and embedder match.
    /// Has no effect unless an embedder is set first.
    pub fn reuse_from(mut self, previous: &VectorIndex) -> Self {
        if let Some(embedder) = &self.embedder {
            let cache = EmbeddingCache::from_index(previous, embedder.id());
            tracing::info!(cached = cache.len(), "embedding cache seeded from previous index");
            self.cache = Some(cache);
        }
        self
    }

    pub fn build(&self, docs: &[Document]) -> Result<VectorIndex> {
        let chunks = self.chunker.chunk_all(docs);
        tracing::info!(documents = docs.len(), chunks = chunks.len(), "documents chunked");
        self.build_chunks(chunks)
    }

    pub fn build_chunks(&self, chunks: Vec<Chunk>) -> Result<VectorIndex> {
        let Some(embedder) = &self.embedder else {
            return VectorIndex::build(chunks, None, None);
        };
        match self.embed_chunks(embedder.as_ref(), &chunks) {
            Ok(vectors) => {
                VectorIndex::build(chunks, Some(vectors), Some(embedder.id().to_string()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding failed, building keyword-only index");
                VectorIndex::build(chunks, None, None)
            }
        }
    }

    fn embed_chunks(&self, embedder: &dyn Embedder, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut cache = match &self.cache {
            Some(c) if c.embedder_id() == embedder.id() => c.clone(),
            _ => EmbeddingCache::new(embedder.id()),
        };
        let hashes: Vec<String> = chunks.iter().map(|c| content_hash(&c.text)).collect();

        // One embedding per distinct missing text; repeated chunks share it.
        let mut seen = HashSet::new();
        let misses: Vec<usize> = (0..chunks.len())
            .filter(|&i| {
                let cached = cache
                    .get(embedder.id(), &hashes[i])
                    .is_some_and(|v| v.len() == embedder.dim());
                !cached && seen.insert(hashes[i].as_str())
            })
            .collect();

        let pb = self.progress_bar(misses.len());
        for batch in misses.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|&i| chunks[i].text.clone()).collect();
            let embedded = embedder.embed_batch(&texts)?;
            if embedded.len() != batch.len() {
                anyhow::bail!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                );
            }
            for (&i, v) in batch.iter().zip(embedded) {
                cache.put(hashes[i].clone(), v);
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();
        tracing::info!(
            embedded = misses.len(),
            reused = chunks.len() - misses.len(),
            embedder = embedder.id(),
            "chunks embedded"
        );

        hashes
            .iter()
            .enumerate()
            .map(|(i, h)| {
                cache
                    .get(embedder.id(), h)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("chunk {} was not embedded", i))
            })
            .collect()
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks \
             ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        pb.set_style(style);
        pb.set_message("embedding");
        pb
    }
}
