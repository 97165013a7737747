use anyhow::Result;
use lexdb_core::traits::Scorer;
use lexdb_core::types::{IndexEntry, ScoredResult};

/// Scores every candidate, drops irrelevant ones and keeps the `k` best.
///
/// The sort is stable, so equal scores stay in candidate order.
pub fn rank(scorer: &dyn Scorer, candidates: &[IndexEntry], k: usize) -> Result<Vec<ScoredResult>> {
    let mut scored = Vec::new();
    for entry in candidates {
        let score = scorer.score(entry)?;
        if scorer.is_relevant(score) {
            scored.push((score, entry));
        }
    }
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(k);
    Ok(scored
        .into_iter()
        .map(|(score, entry)| ScoredResult {
            chunk_id: entry.chunk_id,
            content: entry.chunk.text.clone(),
            source: entry.chunk.source().to_string(),
            score,
        })
        .collect())
}
