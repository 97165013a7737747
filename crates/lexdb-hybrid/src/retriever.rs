use std::sync::{Arc, PoisonError, RwLock};

use lexdb_core::config::{RetrievalSettings, Settings};
use lexdb_core::error::{Error, Result};
use lexdb_core::traits::Embedder;
use lexdb_core::types::{validate_query, QueryRequest, ScoredResult, Strategy};
use lexdb_text::KeywordScorer;
use lexdb_vector::SemanticScorer;
use tokio::sync::Semaphore;

use crate::context::RetrievalContext;
use crate::rank::rank;
use crate::response::{HealthReport, QueryResponse};

/// Ranked results together with the strategy that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub strategy: Strategy,
    pub results: Vec<ScoredResult>,
}

/// Retrieval coordinator.
///
/// Serves queries against the currently published [`RetrievalContext`].
/// Each query clones the `Arc` once and works on that snapshot, so a
/// concurrent [`Retriever::reload`] never affects a query in flight.
pub struct Retriever {
    context: RwLock<Arc<RetrievalContext>>,
    embed_permits: Semaphore,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(context: RetrievalContext, settings: RetrievalSettings) -> Self {
        let permits = settings.max_concurrent_embeddings.max(1);
        Self {
            context: RwLock::new(Arc::new(context)),
            embed_permits: Semaphore::new(permits),
            settings,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let context = RetrievalContext::initialize(settings)?;
        Ok(Self::new(context, settings.retrieval.clone()))
    }

    /// Current snapshot.
    pub fn context(&self) -> Arc<RetrievalContext> {
        self.context.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Publishes a new context, e.g. after a reindex.
    pub fn reload(&self, context: RetrievalContext) {
        let context = Arc::new(context);
        tracing::info!(
            chunks = context.index().len(),
            semantic = context.semantic_available(),
            "retrieval context reloaded"
        );
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = context;
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// Top-`k` chunks for `query`, best first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredResult>> {
        Ok(self.search(query, k).await?.results)
    }

    /// Like [`Retriever::retrieve`], also reporting which strategy answered.
    ///
    /// Semantic scoring is tried first when available. A failure or an empty
    /// semantic result falls back to keyword scoring for this query only.
    pub async fn search(&self, query: &str, k: usize) -> Result<Retrieval> {
        let query = validate_query(query)?;
        let ctx = self.context();
        if ctx.index().is_empty() {
            return Err(Error::IndexNotLoaded);
        }

        if let (true, Some(embedder)) = (ctx.semantic_available(), ctx.embedder()) {
            match self.semantic(&ctx, embedder, query, k).await {
                Ok(results) if !results.is_empty() => {
                    return Ok(Retrieval { strategy: Strategy::Semantic, results });
                }
                Ok(_) => tracing::debug!("no semantic matches, trying keywords"),
                Err(e) => tracing::warn!(
                    query_len = query.len(),
                    error = %e,
                    "semantic retrieval failed, using keywords"
                ),
            }
        }

        let scorer = KeywordScorer::new(query, self.settings.keyword_match);
        let results = rank(&scorer, ctx.index().candidates(), k)
            .map_err(|e| Error::KeywordScoringFailure(format!("{e:#}")))?;
        Ok(Retrieval { strategy: Strategy::Keyword, results })
    }

    async fn semantic(
        &self,
        ctx: &RetrievalContext,
        embedder: Arc<dyn Embedder>,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredResult>> {
        let vector = self.embed_query(embedder, query.to_string()).await?;
        let scorer = SemanticScorer::new(vector, self.settings.min_similarity);
        rank(&scorer, ctx.index().candidates(), k)
            .map_err(|e| Error::SemanticScoringFailure(format!("{e:#}")))
    }

    async fn embed_query(&self, embedder: Arc<dyn Embedder>, query: String) -> Result<Vec<f32>> {
        let _permit = self
            .embed_permits
            .acquire()
            .await
            .map_err(|e| Error::SemanticScoringFailure(e.to_string()))?;
        tokio::task::spawn_blocking(move || embedder.embed(&query))
            .await
            .map_err(|e| Error::SemanticScoringFailure(e.to_string()))?
            .map_err(|e| Error::SemanticScoringFailure(format!("{e:#}")))
    }

    /// Answers a request for the external API layer.
    ///
    /// Only `EmptyQuery` is returned as an error; every other failure becomes
    /// a `not_ready` or `no_matches` response.
    pub async fn respond(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let query = request.validated_query()?;
        let max_k = self.settings.max_k.max(1);
        let k = request.max_results.unwrap_or(self.settings.default_k).clamp(1, max_k);
        if let Some(language) = &request.language {
            tracing::debug!(%language, k, "query");
        }
        match self.search(query, k).await {
            Ok(r) if r.results.is_empty() => Ok(QueryResponse::no_matches(Some(r.strategy))),
            Ok(r) => Ok(QueryResponse::found(r.strategy, r.results)),
            Err(Error::IndexNotLoaded) => Ok(QueryResponse::not_ready()),
            Err(e) if e.is_user_error() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "query failed");
                Ok(QueryResponse::no_matches(None))
            }
        }
    }

    pub fn health(&self) -> HealthReport {
        let ctx = self.context();
        let index = ctx.index();
        HealthReport {
            semantic_embedder: ctx.embedder_status().is_ready(),
            embedder_id: ctx.embedder().map(|e| e.id().to_string()),
            index_loaded: !index.is_empty(),
            vectors_loaded: index.has_vectors(),
            documents: index.documents(),
            chunks: index.len(),
            active_strategy: ctx.preferred_strategy(),
        }
    }
}
