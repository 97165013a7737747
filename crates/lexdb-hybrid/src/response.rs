use lexdb_core::types::{ScoredResult, Strategy};
use serde::{Deserialize, Serialize};

pub const NO_MATCHES_MESSAGE: &str = "No relevant information found for this query.";
pub const NOT_READY_MESSAGE: &str = "The legal knowledge base is not loaded yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Found,
    NoMatches,
    /// No documents are loaded at all, as opposed to none matching.
    NotReady,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub content: String,
    pub source: String,
    pub score: f64,
}

impl From<ScoredResult> for ResultItem {
    fn from(r: ScoredResult) -> Self {
        Self { content: r.content, source: r.source, score: r.score }
    }
}

/// What the external API layer returns to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    pub results: Vec<ResultItem>,
}

impl QueryResponse {
    pub fn found(strategy: Strategy, results: Vec<ScoredResult>) -> Self {
        Self {
            status: ResponseStatus::Found,
            strategy: Some(strategy),
            results: results.into_iter().map(Into::into).collect(),
        }
    }

    pub fn no_matches(strategy: Option<Strategy>) -> Self {
        Self { status: ResponseStatus::NoMatches, strategy, results: Vec::new() }
    }

    pub fn not_ready() -> Self {
        Self { status: ResponseStatus::NotReady, strategy: None, results: Vec::new() }
    }

    /// User-facing text for the empty cases.
    pub fn message(&self) -> Option<&'static str> {
        match self.status {
            ResponseStatus::Found => None,
            ResponseStatus::NoMatches => Some(NO_MATCHES_MESSAGE),
            ResponseStatus::NotReady => Some(NOT_READY_MESSAGE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub semantic_embedder: bool,
    pub embedder_id: Option<String>,
    pub index_loaded: bool,
    pub vectors_loaded: bool,
    pub documents: usize,
    pub chunks: usize,
    pub active_strategy: Option<Strategy>,
}
