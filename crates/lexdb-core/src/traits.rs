use crate::types::{IndexEntry, Strategy};

/// Maps text to a fixed-length vector. Implementations must be deterministic
/// for a given model configuration.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the model/configuration (e.g. `hash:xxh64:d768`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Relevance of one index entry for a query the scorer was prepared with.
/// Higher is always better.
pub trait Scorer: Send + Sync {
    fn strategy(&self) -> Strategy;
    fn score(&self, entry: &IndexEntry) -> anyhow::Result<f64>;
    /// Whether a score qualifies the entry for the result list at all.
    fn is_relevant(&self, score: f64) -> bool;
}
