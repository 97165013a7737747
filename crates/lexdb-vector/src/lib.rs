//! Chunk index with optional vectors, its JSON persistence, the cosine
//! scorer and the batch builder that produces it.

pub mod builder;
pub mod cache;
pub mod index;
pub mod knowledge_base;
pub mod score;
pub mod store;

pub use builder::IndexBuilder;
pub use cache::EmbeddingCache;
pub use index::{content_hash, VectorIndex};
pub use knowledge_base::{knowledge_base_index, load_knowledge_base};
pub use score::{cosine_similarity, SemanticScorer};
