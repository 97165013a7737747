//! Domain types shared by the chunker, the index and the retrieval engines.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A raw legal text as handed over by the ingestion side.
///
/// - `title`: stable source name, used for attribution
/// - `text`: full extracted text
/// - `source_file`/`act_name`: optional provenance metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub act_name: Option<String>,
}

impl Document {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self { title: title.into(), text: text.into(), source_file: None, act_name: None }
    }

    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    pub fn with_act_name(mut self, act_name: impl Into<String>) -> Self {
        self.act_name = Some(act_name.into());
        self
    }
}

/// A bounded window of a document's text.
///
/// `seq` is the position within the parent document and `start` the offset
/// of the first character, both counted in chars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    pub seq: usize,
    pub start: usize,
    pub text: String,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Label used when citing this chunk.
    pub fn source(&self) -> &str {
        &self.title
    }
}

/// One row of the index: a chunk plus its optional embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk_id: usize,
    pub chunk: Chunk,
    pub content_hash: String,
    pub vector: Option<Vec<f32>>,
}

/// Which scoring path produced a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Semantic,
    Keyword,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Semantic => f.write_str("semantic"),
            Self::Keyword => f.write_str("keyword"),
        }
    }
}

/// A ranked hit. Produced per query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub chunk_id: usize,
    pub content: String,
    pub source: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub language: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), max_results: None, language: None }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Returns the trimmed query text, or `EmptyQuery`.
    pub fn validated_query(&self) -> Result<&str> {
        validate_query(&self.query)
    }
}

pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyQuery);
    }
    Ok(trimmed)
}
