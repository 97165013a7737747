use std::sync::Arc;

use lexdb_core::chunker::Chunker;
use lexdb_core::config::Settings;
use lexdb_core::error::{Error, Result};
use lexdb_core::traits::Embedder;
use lexdb_core::types::Strategy;
use lexdb_embed::{probe_embedder, EmbedderStatus};
use lexdb_vector::{knowledge_base_index, VectorIndex};

/// Startup state of the retrieval engine: which embedder (if any) is usable
/// and which index snapshot is served.
///
/// Built once and published through [`crate::Retriever`]; replaced only by
/// an explicit reload, never mutated.
pub struct RetrievalContext {
    embedder: EmbedderStatus,
    index: Arc<VectorIndex>,
    semantic: bool,
}

impl RetrievalContext {
    pub fn new(embedder: EmbedderStatus, index: VectorIndex) -> Self {
        let semantic = match &embedder {
            EmbedderStatus::Unavailable(reason) => {
                let error = Error::EmbedderUnavailable(reason.clone());
                tracing::warn!(%error, "keyword-only retrieval for this session");
                false
            }
            EmbedderStatus::Ready(e) => compatible(e.as_ref(), &index),
        };
        Self { embedder, index: Arc::new(index), semantic }
    }

    /// Context that never attempts semantic scoring.
    pub fn keyword_only(index: VectorIndex) -> Self {
        Self::new(EmbedderStatus::Unavailable("semantic retrieval not configured".into()), index)
    }

    /// Probes the embedder and loads the index named by `settings`, falling
    /// back to the simple knowledge base and finally to an empty index.
    pub fn initialize(settings: &Settings) -> Result<Self> {
        let chunker = Chunker::new(settings.chunking.clone())?;
        let embedder = probe_embedder(&settings.embedding);
        let index_path = settings.data.index_path();
        let index = match VectorIndex::load(&index_path) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "index unavailable, trying knowledge base");
                let kb_path = settings.data.knowledge_base_path();
                match knowledge_base_index(&kb_path, &chunker) {
                    Ok(index) => index,
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "knowledge base unavailable, serving empty index"
                        );
                        VectorIndex::empty()
                    }
                }
            }
        };
        Ok(Self::new(embedder, index))
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn embedder(&self) -> Option<Arc<dyn Embedder>> {
        self.embedder.embedder()
    }

    pub fn embedder_status(&self) -> &EmbedderStatus {
        &self.embedder
    }

    /// Semantic scoring needs a ready embedder and an index whose vectors
    /// that same embedder produced.
    pub fn semantic_available(&self) -> bool {
        self.semantic
    }

    /// Strategy a query would try first, or `None` when nothing is loaded.
    pub fn preferred_strategy(&self) -> Option<Strategy> {
        if self.index.is_empty() {
            None
        } else if self.semantic {
            Some(Strategy::Semantic)
        } else {
            Some(Strategy::Keyword)
        }
    }
}

fn compatible(embedder: &dyn Embedder, index: &VectorIndex) -> bool {
    if !index.has_vectors() {
        tracing::info!("index carries no vectors, keyword retrieval only");
        return false;
    }
    if index.embedder_id() != Some(embedder.id()) || index.dimension() != Some(embedder.dim()) {
        tracing::warn!(
            index_embedder = index.embedder_id().unwrap_or("-"),
            embedder = embedder.id(),
            "index was built with a different embedder, keyword retrieval only"
        );
        return false;
    }
    true
}
