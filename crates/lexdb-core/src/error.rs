use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The query was empty after trimming. Never retried.
    #[error("Query is empty")]
    EmptyQuery,

    /// No semantic embedder could be loaded for this session.
    #[error("Embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    /// Vector scoring failed for a single query.
    #[error("Semantic scoring failed: {0}")]
    SemanticScoringFailure(String),

    /// Keyword scoring failed after the semantic path was skipped or failed.
    #[error("Keyword scoring failed: {0}")]
    KeywordScoringFailure(String),

    /// No documents are available to search.
    #[error("Index not loaded")]
    IndexNotLoaded,

    #[error("Corrupt index at {}: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn corrupt_index(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::CorruptIndex { path: path.into(), reason: reason.to_string() }
    }

    /// Errors the caller caused, as opposed to failures of the engine.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::EmptyQuery)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
