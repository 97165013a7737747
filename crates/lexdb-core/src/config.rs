//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys split on `__`, e.g. `APP_RETRIEVAL__DEFAULT_K=5`).
//! Every setting has a default, so an empty configuration is valid.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunker::ChunkingConfig;
use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Extracts and validates the full typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings =
            self.figment.extract().map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        let hash_backend = settings.embedding.backend == EmbeddingBackend::Hash;
        if matches!(env, "prod" | "production") && hash_backend {
            tracing::warn!("placeholder hash embeddings configured for production");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        self.chunking.validate()?;
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be positive".into()));
        }
        let r = &self.retrieval;
        if r.default_k == 0 {
            return Err(Error::InvalidConfig("retrieval.default_k must be at least 1".into()));
        }
        if r.max_k < r.default_k {
            return Err(Error::InvalidConfig(format!(
                "retrieval.max_k ({}) must be >= retrieval.default_k ({})",
                r.max_k, r.default_k
            )));
        }
        if r.max_concurrent_embeddings == 0 {
            return Err(Error::InvalidConfig(
                "retrieval.max_concurrent_embeddings must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub documents_dir: String,
    pub index_path: String,
    pub knowledge_base_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            documents_dir: "data/processed_text".to_string(),
            index_path: "data/index/lexdb_index.json".to_string(),
            knowledge_base_path: "data/simple_knowledge_base.json".to_string(),
        }
    }
}

impl DataSettings {
    pub fn documents_dir(&self) -> PathBuf {
        expand_path(&self.documents_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.index_path)
    }

    pub fn knowledge_base_path(&self) -> PathBuf {
        expand_path(&self.knowledge_base_path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local BERT-family encoder loaded from `model_dir`.
    #[default]
    Model,
    /// Deterministic token-hash placeholder.
    Hash,
    /// No embedder; keyword retrieval only.
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model_dir: String,
    pub dimension: usize,
    pub hash_max_tokens: usize,
    pub max_len: usize,
    pub normalize: bool,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Model,
            model_dir: "models/InLegalBERT".to_string(),
            dimension: 768,
            hash_max_tokens: 100,
            max_len: 512,
            normalize: true,
            batch_size: 32,
        }
    }
}

impl EmbeddingSettings {
    pub fn model_dir(&self) -> PathBuf {
        expand_path(&self.model_dir)
    }
}

/// How keyword terms are matched against chunk text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMatch {
    /// Raw, possibly overlapping substring occurrences ("act" matches "contract").
    #[default]
    Substring,
    /// Occurrences delimited by non-alphanumeric chars on both sides.
    Word,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_k: usize,
    pub max_k: usize,
    /// Semantic hits must score strictly above this cosine similarity.
    ///
    /// Cosine ranges over [-1, 1], but the default of 0.0 deliberately drops
    /// orthogonal and opposed chunks, matching how keyword mode drops zero
    /// counts. Set it below -1.0 to keep every semantic candidate.
    pub min_similarity: f64,
    pub keyword_match: KeywordMatch,
    pub max_concurrent_embeddings: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_k: 3,
            max_k: 20,
            min_similarity: 0.0,
            keyword_match: KeywordMatch::Substring,
            max_concurrent_embeddings: 4,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
