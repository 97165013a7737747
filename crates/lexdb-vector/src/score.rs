use anyhow::{anyhow, bail, Result};
use lexdb_core::traits::Scorer;
use lexdb_core::types::{IndexEntry, Strategy};

/// Cosine similarity of two equal-length vectors, in `[-1, 1]`.
///
/// Zero vectors have similarity 0 with everything.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

/// Scores entries by cosine similarity to a query embedding.
#[derive(Debug, Clone)]
pub struct SemanticScorer {
    query: Vec<f32>,
    min_similarity: f64,
}

impl SemanticScorer {
    pub fn new(query: Vec<f32>, min_similarity: f64) -> Self {
        Self { query, min_similarity }
    }
}

impl Scorer for SemanticScorer {
    fn strategy(&self) -> Strategy {
        Strategy::Semantic
    }

    fn score(&self, entry: &IndexEntry) -> Result<f64> {
        let id = entry.chunk_id;
        let v = entry.vector.as_deref().ok_or_else(|| anyhow!("chunk {} has no vector", id))?;
        if v.len() != self.query.len() {
            bail!("chunk {} has dimension {}, query has {}", id, v.len(), self.query.len());
        }
        Ok(cosine_similarity(&self.query, v))
    }

    fn is_relevant(&self, score: f64) -> bool {
        score > self.min_similarity
    }
}
