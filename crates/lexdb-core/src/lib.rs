//! Shared domain types, configuration, chunking and the capability traits
//! used by the lexdb retrieval crates.

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use chunker::{Chunker, ChunkingConfig, SplitterKind};
pub use error::{Error, Result};
pub use traits::{Embedder, Scorer};
pub use types::{Chunk, Document, IndexEntry, QueryRequest, ScoredResult, Strategy};
