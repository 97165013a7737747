//! Keyword-overlap scoring, the retrieval path that needs no model.

pub mod keyword;

pub use keyword::{count_occurrences, count_word_occurrences, KeywordScorer};
