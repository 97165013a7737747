use std::hash::Hasher;

use anyhow::Result;
use lexdb_core::traits::Embedder;
use twox_hash::XxHash64;

/// Deterministic bag-of-tokens stand-in for a semantic model.
///
/// The first `max_tokens` lowercased whitespace tokens are hashed (XxHash64,
/// seed 0) into `dim` buckets, each hit adds 1.0, and the result is
/// L2-normalized. Text without tokens maps to the zero vector.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    max_tokens: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize, max_tokens: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, max_tokens, id: format!("hash:xxh64:d{dim}:t{max_tokens}") }
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        #[allow(clippy::cast_possible_truncation)]
        let idx = (hasher.finish() % self.dim as u64) as usize;
        idx
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        for token in text.to_lowercase().split_whitespace().take(self.max_tokens) {
            v[self.bucket(token)] += 1.0;
        }
        crate::l2_normalize(&mut v);
        Ok(v)
    }
}
