//! Text embedders: a candle BERT encoder and a deterministic hash stand-in.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use lexdb_core::config::{EmbeddingBackend, EmbeddingSettings};

pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use lexdb_core::traits::Embedder;
pub use model::BertEmbedder;
pub use pool::{l2_normalize_rows, masked_mean, masked_mean_l2};

/// Outcome of probing the configured embedding backend.
#[derive(Clone)]
pub enum EmbedderStatus {
    Ready(Arc<dyn Embedder>),
    Unavailable(String),
}

impl EmbedderStatus {
    pub fn embedder(&self) -> Option<Arc<dyn Embedder>> {
        match self {
            Self::Ready(e) => Some(Arc::clone(e)),
            Self::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl std::fmt::Debug for EmbedderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(e) => f.debug_tuple("Ready").field(&e.id()).finish(),
            Self::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1` (or `true`) forces the hash embedder regardless of config.
pub fn fake_embeddings_forced() -> bool {
    is_enabled(std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().as_deref())
}

fn is_enabled(flag: Option<&str>) -> bool {
    matches!(flag, Some(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Builds the embedder selected by `settings`.
pub fn load_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if fake_embeddings_forced() {
        tracing::info!("using hash embedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Arc::new(HashEmbedder::new(settings.dimension, settings.hash_max_tokens)));
    }
    match settings.backend {
        EmbeddingBackend::Hash => {
            tracing::info!(dim = settings.dimension, "using hash embedder");
            Ok(Arc::new(HashEmbedder::new(settings.dimension, settings.hash_max_tokens)))
        }
        EmbeddingBackend::Model => {
            let model =
                BertEmbedder::load(&settings.model_dir(), settings.max_len, settings.normalize)?;
            Ok(Arc::new(model))
        }
        EmbeddingBackend::None => Err(anyhow!("semantic embedding disabled by configuration")),
    }
}

/// Like [`load_embedder`], but turns a load failure into `Unavailable` so
/// callers can run keyword-only.
pub fn probe_embedder(settings: &EmbeddingSettings) -> EmbedderStatus {
    match load_embedder(settings) {
        Ok(e) => EmbedderStatus::Ready(e),
        Err(e) => EmbedderStatus::Unavailable(format!("{e:#}")),
    }
}

/// Scales `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
