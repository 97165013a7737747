use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use lexdb_core::config::RetrievalSettings;
use lexdb_core::error::Error;
use lexdb_core::traits::Embedder;
use lexdb_core::types::{Chunk, QueryRequest, Strategy};
use lexdb_embed::EmbedderStatus;
use lexdb_hybrid::{ResponseStatus, RetrievalContext, Retriever};
use lexdb_vector::VectorIndex;

const IPC_420: &str = "Whoever cheats and dishonestly induces the person deceived to deliver \
any property to any person, shall be punished with imprisonment of either description for a \
term which may extend to seven years, and shall also be liable to fine.";
const CONTRACT_10: &str = "All agreements are contracts if made by free consent of parties \
competent to contract, for a lawful consideration and with a lawful object.";

/// Three-topic embedder: cheating, contracts, everything else.
struct TopicEmbedder;

impl Embedder for TopicEmbedder {
    fn id(&self) -> &str {
        "topic:v1"
    }
    fn dim(&self) -> usize {
        3
    }
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let t = text.to_lowercase();
        Ok(if t.contains("cheat") {
            vec![1.0, 0.0, 0.0]
        } else if t.contains("agreement") || t.contains("contract") {
            vec![0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 1.0]
        })
    }
}

/// Claims to be the embedder the index was built with, but never answers.
struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn id(&self) -> &str {
        "topic:v1"
    }
    fn dim(&self) -> usize {
        3
    }
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Err(anyhow!("inference backend crashed"))
    }
}

fn chunk(source: &str, seq: usize, text: &str) -> Chunk {
    Chunk { title: source.into(), source_file: None, seq, start: 0, text: text.into() }
}

fn legal_chunks() -> Vec<Chunk> {
    vec![chunk("IPC Section 420", 0, IPC_420), chunk("Contract Act Section 10", 0, CONTRACT_10)]
}

fn semantic_index(chunks: Vec<Chunk>) -> VectorIndex {
    let vectors = chunks.iter().map(|c| TopicEmbedder.embed(&c.text).unwrap()).collect();
    VectorIndex::build(chunks, Some(vectors), Some(TopicEmbedder.id().into())).unwrap()
}

fn keyword_retriever(chunks: Vec<Chunk>) -> Retriever {
    let index = VectorIndex::build(chunks, None, None).unwrap();
    Retriever::new(RetrievalContext::keyword_only(index), RetrievalSettings::default())
}

fn semantic_retriever(embedder: Arc<dyn Embedder>, settings: RetrievalSettings) -> Retriever {
    let index = semantic_index(legal_chunks());
    let context = RetrievalContext::new(EmbedderStatus::Ready(embedder), index);
    Retriever::new(context, settings)
}

#[tokio::test]
async fn keyword_scenario_returns_only_the_cheating_section() {
    let retriever = keyword_retriever(legal_chunks());
    let hits = retriever.retrieve("what is cheating punishment", 1).await.unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source, "IPC Section 420");
    assert_eq!(hits[0].content, IPC_420);
    assert!(hits[0].score > 0.0);

    let all = retriever.retrieve("what is cheating punishment", 5).await.unwrap();
    assert_eq!(all.len(), 1, "the contract section has no matching terms");
}

#[tokio::test]
async fn semantic_scenario_returns_only_the_cheating_section() {
    let retriever = semantic_retriever(Arc::new(TopicEmbedder), RetrievalSettings::default());
    let found = retriever.search("what is cheating punishment", 1).await.unwrap();

    assert_eq!(found.strategy, Strategy::Semantic);
    assert_eq!(found.results.len(), 1);
    assert_eq!(found.results[0].source, "IPC Section 420");
    assert!((found.results[0].score - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn empty_query_fails_before_scoring() {
    let retriever = semantic_retriever(Arc::new(FailingEmbedder), RetrievalSettings::default());
    assert!(matches!(retriever.retrieve("", 3).await, Err(Error::EmptyQuery)));
    assert!(matches!(retriever.retrieve(" \t\n", 3).await, Err(Error::EmptyQuery)));
    assert!(matches!(retriever.respond(&QueryRequest::new("  ")).await, Err(Error::EmptyQuery)));
}

#[tokio::test]
async fn no_matching_terms_is_an_empty_list() {
    let retriever = keyword_retriever(legal_chunks());
    let hits = retriever.retrieve("murder robbery", 3).await.unwrap();
    assert!(hits.is_empty());

    let response = retriever.respond(&QueryRequest::new("murder robbery")).await.unwrap();
    assert_eq!(response.status, ResponseStatus::NoMatches);
    assert!(response.results.is_empty());
    assert!(response.message().is_some());
}

#[tokio::test]
async fn empty_index_is_not_ready() {
    let context = RetrievalContext::keyword_only(VectorIndex::empty());
    let retriever = Retriever::new(context, RetrievalSettings::default());
    assert!(matches!(retriever.retrieve("bail", 3).await, Err(Error::IndexNotLoaded)));

    let response = retriever.respond(&QueryRequest::new("bail")).await.unwrap();
    assert_eq!(response.status, ResponseStatus::NotReady);
    assert_eq!(response.message(), Some(lexdb_hybrid::response::NOT_READY_MESSAGE));
}

#[tokio::test]
async fn top_k_is_exactly_the_k_best() {
    let counts = [1usize, 3, 2, 5, 4, 3, 0];
    let chunks: Vec<Chunk> = counts
        .iter()
        .enumerate()
        .map(|(i, n)| chunk(&format!("doc{i}"), 0, &"bail ".repeat(*n)))
        .collect();
    let retriever = keyword_retriever(chunks);

    for k in 1..=8 {
        let hits = retriever.retrieve("bail", k).await.unwrap();
        assert!(hits.len() <= k);
        assert_eq!(hits.len(), k.min(6), "six chunks have a positive score");
    }

    let hits = retriever.retrieve("bail", 4).await.unwrap();
    let sources: Vec<&str> = hits.iter().map(|h| h.source.as_str()).collect();
    assert_eq!(sources, ["doc3", "doc4", "doc1", "doc5"], "ties keep index order");
    let scores: Vec<f64> = hits.iter().map(|h| h.score).collect();
    assert_eq!(scores, [5.0, 4.0, 3.0, 3.0]);
}

#[tokio::test]
async fn retrieval_is_deterministic() {
    let retriever = semantic_retriever(Arc::new(TopicEmbedder), RetrievalSettings::default());
    let first = retriever.retrieve("contract consent", 2).await.unwrap();
    for _ in 0..10 {
        assert_eq!(retriever.retrieve("contract consent", 2).await.unwrap(), first);
    }
}

#[tokio::test]
async fn failing_embedder_matches_pure_keyword_scoring() {
    let failing = semantic_retriever(Arc::new(FailingEmbedder), RetrievalSettings::default());
    assert!(failing.context().semantic_available());
    let keyword = keyword_retriever(legal_chunks());

    for query in ["what is cheating punishment", "contract consent", "lawful object", "theft"] {
        let fallback = failing.search(query, 3).await.unwrap();
        assert_eq!(fallback.strategy, Strategy::Keyword);
        assert_eq!(fallback.results, keyword.retrieve(query, 3).await.unwrap(), "query {query:?}");
    }
}

#[tokio::test]
async fn empty_semantic_result_falls_back_to_keywords() {
    // "lawful object" embeds to the third topic, orthogonal to both chunks.
    let retriever = semantic_retriever(Arc::new(TopicEmbedder), RetrievalSettings::default());
    let found = retriever.search("lawful object", 3).await.unwrap();
    assert_eq!(found.strategy, Strategy::Keyword);
    assert_eq!(found.results.len(), 1);
    assert_eq!(found.results[0].source, "Contract Act Section 10");
}

#[tokio::test]
async fn respond_clamps_result_count() {
    let chunks: Vec<Chunk> =
        (0..30).map(|i| chunk(&format!("doc{i}"), 0, "bail granted")).collect();
    let settings = RetrievalSettings { default_k: 3, max_k: 10, ..RetrievalSettings::default() };
    let index = VectorIndex::build(chunks, None, None).unwrap();
    let retriever = Retriever::new(RetrievalContext::keyword_only(index), settings);

    let default = retriever.respond(&QueryRequest::new("bail")).await.unwrap();
    assert_eq!(default.status, ResponseStatus::Found);
    assert_eq!(default.strategy, Some(Strategy::Keyword));
    assert_eq!(default.results.len(), 3);

    let zero = retriever.respond(&QueryRequest::new("bail").with_max_results(0)).await.unwrap();
    assert_eq!(zero.results.len(), 1);

    let request = QueryRequest::new("bail").with_max_results(100).with_language("en");
    let many = retriever.respond(&request).await.unwrap();
    assert_eq!(many.results.len(), 10);
}

#[tokio::test]
async fn response_serializes_for_the_api_layer() {
    let retriever = keyword_retriever(legal_chunks());
    let request = QueryRequest::new("cheats").with_max_results(1);
    let response = retriever.respond(&request).await.unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "found");
    assert_eq!(json["strategy"], "keyword");
    assert_eq!(json["results"][0]["source"], "IPC Section 420");
    assert!(json["results"][0]["content"].as_str().unwrap().starts_with("Whoever cheats"));
}

#[tokio::test]
async fn health_reports_loaded_state() {
    let semantic =
        semantic_retriever(Arc::new(TopicEmbedder), RetrievalSettings::default()).health();
    assert!(semantic.semantic_embedder);
    assert_eq!(semantic.embedder_id.as_deref(), Some("topic:v1"));
    assert!(semantic.index_loaded && semantic.vectors_loaded);
    assert_eq!((semantic.documents, semantic.chunks), (2, 2));
    assert_eq!(semantic.active_strategy, Some(Strategy::Semantic));

    let keyword = keyword_retriever(legal_chunks()).health();
    assert!(!keyword.semantic_embedder);
    assert!(!keyword.vectors_loaded);
    assert_eq!(keyword.active_strategy, Some(Strategy::Keyword));

    let context = RetrievalContext::keyword_only(VectorIndex::empty());
    let empty = Retriever::new(context, RetrievalSettings::default());
    let report = empty.health();
    assert!(!report.index_loaded);
    assert_eq!(report.active_strategy, None);
}

#[tokio::test]
async fn mismatched_embedder_is_not_used_for_scoring() {
    struct OtherEmbedder;
    impl Embedder for OtherEmbedder {
        fn id(&self) -> &str {
            "other:v2"
        }
        fn dim(&self) -> usize {
            3
        }
        fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }
    let retriever = semantic_retriever(Arc::new(OtherEmbedder), RetrievalSettings::default());
    assert!(!retriever.context().semantic_available());
    let found = retriever.search("contract consent", 3).await.unwrap();
    assert_eq!(found.strategy, Strategy::Keyword);
}

#[tokio::test]
async fn reload_publishes_new_snapshot() {
    let retriever = keyword_retriever(legal_chunks());
    let before = retriever.context();

    let evidence = vec![chunk("Evidence Act Section 3", 0, "Court includes all Judges")];
    let index = VectorIndex::build(evidence, None, None).unwrap();
    retriever.reload(RetrievalContext::keyword_only(index));

    assert_eq!(before.index().len(), 2, "old snapshot is unchanged");
    let hits = retriever.retrieve("judges", 3).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source, "Evidence Act Section 3");
    assert!(retriever.retrieve("cheating", 3).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_see_consistent_results() {
    let settings =
        RetrievalSettings { max_concurrent_embeddings: 2, ..RetrievalSettings::default() };
    let retriever = Arc::new(semantic_retriever(Arc::new(TopicEmbedder), settings));
    let expected = retriever.retrieve("what is cheating punishment", 2).await.unwrap();

    let tasks = (0..32).map(|i| {
        let retriever = Arc::clone(&retriever);
        tokio::spawn(async move {
            if i % 8 == 0 {
                let index = semantic_index(legal_chunks());
                let status = EmbedderStatus::Ready(Arc::new(TopicEmbedder));
                retriever.reload(RetrievalContext::new(status, index));
            }
            retriever.retrieve("what is cheating punishment", 2).await
        })
    });
    for joined in futures::future::join_all(tasks).await {
        assert_eq!(joined.unwrap().unwrap(), expected);
    }
}

/// Topic embedder that records how many `embed` calls overlap.
#[derive(Default)]
struct SlowTopicEmbedder {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Embedder for SlowTopicEmbedder {
    fn id(&self) -> &str {
        TopicEmbedder.id()
    }
    fn dim(&self) -> usize {
        TopicEmbedder.dim()
    }
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        TopicEmbedder.embed(text)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn query_embeddings_respect_the_concurrency_limit() {
    let embedder = Arc::new(SlowTopicEmbedder::default());
    let settings =
        RetrievalSettings { max_concurrent_embeddings: 2, ..RetrievalSettings::default() };
    let retriever = Arc::new(semantic_retriever(embedder.clone(), settings));

    let tasks = (0..16).map(|_| {
        let retriever = Arc::clone(&retriever);
        tokio::spawn(async move { retriever.search("what is cheating punishment", 1).await })
    });
    for joined in futures::future::join_all(tasks).await {
        let found = joined.unwrap().unwrap();
        assert_eq!(found.strategy, Strategy::Semantic);
        assert_eq!(found.results[0].source, "IPC Section 420");
    }

    let peak = embedder.peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak in-flight embeddings was {peak}");
    assert_eq!(embedder.in_flight.load(Ordering::SeqCst), 0);
}
