//! Fallback, timeout, and accounting behavior of the embedding pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::Mutex;

use vectra_embeddings::{Embedding, EmbeddingError, EmbeddingProvider, ModelInfo, Result};
use vectra_pipeline::{CacheConfig, EmbeddingPipeline, HealthStatus, PipelineConfig};

/// Provider that always fails.
struct FailingProvider {
    id: &'static str,
}

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    fn id(&self) -> &str {
        self.id
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::new(self.id, "failing", None)
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Embedding>> {
        Err(EmbeddingError::ProviderUnavailable(format!(
            "{} is down",
            self.id
        )))
    }
}

/// Provider that hangs until cancelled.
struct HangingProvider;

#[async_trait]
impl EmbeddingProvider for HangingProvider {
    fn id(&self) -> &str {
        "openai"
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::new("openai", "hanging", None)
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Embedding>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

/// Provider that records the batches it is asked to embed.
struct CountingProvider {
    calls: Mutex<Vec<Vec<String>>>,
    count: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn id(&self) -> &str {
        "counting"
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::new("counting", "counting", Some(2))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().await.push(texts.to_vec());
        Ok(texts.iter().map(|_| vec![1.0, 2.0]).collect())
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn base_config() -> PipelineConfig {
    init_logging();
    PipelineConfig::new().with_timeout_secs(0.5)
}

#[tokio::test]
async fn fallback_liveness_when_all_remotes_fail() {
    let providers: Vec<Arc<dyn EmbeddingProvider>> = vec![
        Arc::new(FailingProvider { id: "openai" }),
        Arc::new(FailingProvider { id: "openrouter" }),
    ];
    let pipeline = EmbeddingPipeline::with_providers(base_config(), providers)
        .await
        .unwrap();

    let result = pipeline.embed_text("hello").await;

    assert_eq!(result.provider_id, "mock");
    assert!(!result.vector.is_empty());
    let metadata = result.metadata.expect("degraded result carries metadata");
    assert!(metadata["error"].contains("down"));
}

#[tokio::test]
async fn timeout_is_bounded_with_hanging_provider() {
    init_logging();
    let providers: Vec<Arc<dyn EmbeddingProvider>> = vec![Arc::new(HangingProvider)];
    let config = PipelineConfig::new().with_timeout_secs(0.1);
    let pipeline = EmbeddingPipeline::with_providers(config, providers)
        .await
        .unwrap();

    let start = Instant::now();
    let result = pipeline.embed_text("hello").await;
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_secs(2),
        "embed_text took {elapsed:?}, expected a small multiple of the 0.1s timeout"
    );
    assert_eq!(result.provider_id, "mock");
    assert!(
        result.metadata.expect("metadata present")["error"].contains("timed out"),
        "last error should be the timeout"
    );
}

#[tokio::test]
async fn batch_falls_back_as_a_unit() {
    let providers: Vec<Arc<dyn EmbeddingProvider>> =
        vec![Arc::new(FailingProvider { id: "openai" })];
    let pipeline = EmbeddingPipeline::with_providers(base_config(), providers)
        .await
        .unwrap();

    let texts: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
    let results = pipeline.embed_batch(&texts).await;

    assert_eq!(results.len(), 3);
    for result in &results {
        assert_eq!(result.provider_id, "mock");
    }
    // Usage attributed to mock by subset size; the failing provider got none.
    let snapshot = pipeline.metrics();
    assert_eq!(snapshot.provider_usage["mock"], 3);
    assert_eq!(snapshot.provider_usage["openai"], 0);
}

#[tokio::test]
async fn partial_batch_cache_issues_one_provider_call() {
    let counting = Arc::new(CountingProvider::new());
    let providers: Vec<Arc<dyn EmbeddingProvider>> =
        vec![Arc::clone(&counting) as Arc<dyn EmbeddingProvider>];
    let pipeline = EmbeddingPipeline::with_providers(base_config(), providers)
        .await
        .unwrap();

    // Prime the cache with A.
    pipeline.embed_text("A").await;
    assert_eq!(counting.count.load(Ordering::SeqCst), 1);

    let texts: Vec<String> = ["A", "B", "C"].iter().map(ToString::to_string).collect();
    let results = pipeline.embed_batch(&texts).await;

    assert!(results[0].cached);
    assert!(!results[1].cached);
    assert!(!results[2].cached);

    // Exactly one more call, covering only the uncached subset.
    assert_eq!(counting.count.load(Ordering::SeqCst), 2);
    let calls = counting.calls.lock().await;
    assert_eq!(calls[1], vec!["B".to_string(), "C".to_string()]);
}

#[tokio::test]
async fn cache_scoped_by_provider_forces_fresh_computation() {
    // Same text embedded under two different primaries: the second pipeline
    // shares no cache with the first, and even with a shared cache the key
    // includes the provider id, so "counting" never sees a mock hit.
    let counting = Arc::new(CountingProvider::new());

    let mock_first = EmbeddingPipeline::with_providers(base_config(), Vec::new())
        .await
        .unwrap();
    let mock_result = mock_first.embed_text("shared text").await;
    assert_eq!(mock_result.provider_id, "mock");

    let providers: Vec<Arc<dyn EmbeddingProvider>> =
        vec![Arc::clone(&counting) as Arc<dyn EmbeddingProvider>];
    let counting_pipeline = EmbeddingPipeline::with_providers(base_config(), providers)
        .await
        .unwrap();

    let fresh = counting_pipeline.embed_text("shared text").await;
    assert_eq!(fresh.provider_id, "counting");
    assert!(!fresh.cached);
    assert_eq!(counting.count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hit_and_miss_accounting_across_two_calls() {
    let pipeline = EmbeddingPipeline::with_providers(base_config(), Vec::new())
        .await
        .unwrap();

    pipeline.embed_text("accounting").await;
    let after_first = pipeline.metrics();
    assert_eq!(after_first.cache_misses, 1);
    assert_eq!(after_first.cache_hits, 0);

    pipeline.embed_text("accounting").await;
    let after_second = pipeline.metrics();
    assert_eq!(after_second.cache_misses, 1);
    assert_eq!(after_second.cache_hits, 1);
    assert!((after_second.cache_hit_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn health_degraded_when_minority_responds() {
    let providers: Vec<Arc<dyn EmbeddingProvider>> = vec![
        Arc::new(FailingProvider { id: "openai" }),
        Arc::new(FailingProvider { id: "openrouter" }),
    ];
    init_logging();
    let config = PipelineConfig::new().with_timeout_secs(0.5);
    let pipeline = EmbeddingPipeline::with_providers(config, providers)
        .await
        .unwrap();

    // Two of three providers fail; only mock answers.
    let report = pipeline.health_check().await;
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.providers.len(), 3);
    assert_eq!(report.cache_ok, Some(true));
}

#[tokio::test]
async fn disabled_cache_reports_no_cache_health() {
    init_logging();
    let config = PipelineConfig::new().with_cache(CacheConfig::disabled());
    let pipeline = EmbeddingPipeline::with_providers(config, Vec::new())
        .await
        .unwrap();

    let report = pipeline.health_check().await;
    assert_eq!(report.cache_ok, None);
    assert_eq!(report.status, HealthStatus::Healthy);
}

#[tokio::test]
async fn concurrent_embed_calls_are_safe() {
    let pipeline = Arc::new(
        EmbeddingPipeline::with_providers(base_config(), Vec::new())
            .await
            .unwrap(),
    );

    let mut handles = Vec::new();
    for i in 0..16 {
        let p = Arc::clone(&pipeline);
        handles.push(tokio::spawn(
            async move { p.embed_text(&format!("t-{i}")).await },
        ));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.provider_id, "mock");
    }

    assert_eq!(pipeline.metrics().total_requests, 16);
}
