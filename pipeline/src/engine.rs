//! The embedding pipeline coordinator.
//!
//! Resolves single and batch requests by probing the cache in chain order,
//! then walking the fallback chain under a per-call timeout. Provider
//! failures are recovered by substitution and never surfaced. The worst
//! case is a deterministic mock vector flagged with the last error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use vectra_embeddings::{
    Embedding, EmbeddingCache, EmbeddingError, EmbeddingProvider, LocalProvider, MockProvider,
    RemoteProvider,
};

use crate::chain::FallbackChain;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::health::{HealthReport, ProviderHealth};
use crate::metrics::{Metrics, MetricsSnapshot};

/// A resolved embedding, annotated with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResult {
    /// The input text.
    pub text: String,

    /// The embedding vector.
    pub vector: Embedding,

    /// Provider that produced the vector.
    pub provider_id: String,

    /// Model behind that provider.
    pub model_name: String,

    /// Whether the vector came from cache.
    pub cached: bool,

    /// Extra annotations; carries `"error"` when the result is a
    /// last-resort mock substitution.
    pub metadata: Option<HashMap<String, String>>,
}

/// Outcome of walking the fallback chain for one uncached subset.
enum ChainOutcome {
    Embedded {
        provider_id: String,
        model_name: String,
        vectors: Vec<Embedding>,
        /// Set when the subset degraded to mock after real failures, so
        /// callers can see what pushed them off the preferred providers.
        error: Option<String>,
    },
    Exhausted {
        last_error: String,
    },
}

/// The resilient multi-provider embedding pipeline.
///
/// Safe for concurrent use: methods take `&self`, providers are stateless
/// after construction, the cache synchronizes internally, and metrics are
/// atomic.
pub struct EmbeddingPipeline {
    config: PipelineConfig,
    chain: FallbackChain,
    cache: EmbeddingCache,
    metrics: Metrics,
    mock: Arc<MockProvider>,
}

impl EmbeddingPipeline {
    /// Construct the pipeline: build providers from configuration (a
    /// provider with missing credentials is simply absent, not an error),
    /// assemble the fallback chain, and open the cache.
    pub async fn new(config: PipelineConfig) -> Result<Self> {
        let providers = Self::build_providers(&config);
        Self::with_providers(config, providers).await
    }

    /// Construct the pipeline around an explicit provider set. The mock
    /// provider is appended unconditionally if absent, so the chain is
    /// never empty.
    pub async fn with_providers(
        config: PipelineConfig,
        mut providers: Vec<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self> {
        info!("Initializing embedding pipeline");

        let mock = Arc::new(MockProvider::new().with_dimensions(config.mock_dimensions));
        if !providers.iter().any(|p| p.id() == "mock") {
            providers.push(Arc::clone(&mock) as Arc<dyn EmbeddingProvider>);
        }

        let chain = FallbackChain::build(config.primary_provider.as_deref(), providers);
        if chain.is_empty() {
            return Err(PipelineError::NoProviders);
        }

        let cache = if !config.cache.enabled {
            EmbeddingCache::disabled()
        } else {
            let ttl = Duration::from_secs(config.cache.ttl_secs);
            match &config.cache.path {
                Some(path) => {
                    EmbeddingCache::with_persistence(path, ttl, config.cache.max_entries).await
                }
                None => EmbeddingCache::new(ttl, config.cache.max_entries),
            }
        };

        let metrics = Metrics::new(&chain.ids());

        info!(providers = chain.len(), "Embedding pipeline initialized");

        Ok(Self {
            config,
            chain,
            cache,
            metrics,
            mock,
        })
    }

    /// Build the provider set the configuration allows.
    fn build_providers(config: &PipelineConfig) -> Vec<Arc<dyn EmbeddingProvider>> {
        let mut providers: Vec<Arc<dyn EmbeddingProvider>> = Vec::new();

        if let Some(key) = &config.openai_api_key {
            providers.push(Arc::new(RemoteProvider::openai(key)));
        }
        if let Some(key) = &config.openrouter_api_key {
            providers.push(Arc::new(RemoteProvider::openrouter(key)));
        }
        if let Some(key) = &config.huggingface_api_key {
            providers.push(Arc::new(RemoteProvider::huggingface(key)));
        }
        if let Some(path) = &config.local_vocab_path {
            providers.push(Arc::new(LocalProvider::new(path, config.local_dimensions)));
        }

        providers
    }

    /// Embed a single text. Never fails: the mock tail of the chain
    /// guarantees a result, degraded at worst.
    pub async fn embed_text(&self, text: &str) -> EmbeddingResult {
        self.metrics.record_requests(1);

        if let Some((provider_id, vector)) = self.cache_lookup(text).await {
            self.metrics.record_cache_hit();
            debug!(provider = %provider_id, "Cache hit");
            return EmbeddingResult {
                text: text.to_string(),
                vector,
                model_name: self.model_name_for(&provider_id),
                provider_id,
                cached: true,
                metadata: None,
            };
        }
        self.metrics.record_cache_miss();

        let texts = vec![text.to_string()];
        match self.embed_uncached(&texts).await {
            ChainOutcome::Embedded {
                provider_id,
                model_name,
                mut vectors,
                error,
            } => match vectors.pop() {
                Some(vector) => EmbeddingResult {
                    text: text.to_string(),
                    vector,
                    provider_id,
                    model_name,
                    cached: false,
                    metadata: error_metadata(error),
                },
                // Length is checked inside embed_uncached.
                None => self.degraded_result(text, "provider returned no vector"),
            },
            ChainOutcome::Exhausted { last_error } => self.degraded_result(text, &last_error),
        }
    }

    /// Embed a batch of texts, one result per input in input order.
    /// Duplicates are resolved independently. Inputs are split into
    /// sub-batches of at most `max_batch_size`; within each sub-batch the
    /// uncached subset walks the fallback chain as a unit. Sub-batches are
    /// awaited sequentially, so dropping the returned future leaves
    /// already-completed sub-batches cached without returning partial
    /// output.
    pub async fn embed_batch(&self, texts: &[String]) -> Vec<EmbeddingResult> {
        self.metrics.record_requests(texts.len() as u64);

        let mut slots: Vec<Option<EmbeddingResult>> = (0..texts.len()).map(|_| None).collect();
        let chunk_size = self.config.max_batch_size.max(1);

        for chunk_start in (0..texts.len()).step_by(chunk_size) {
            let chunk_end = (chunk_start + chunk_size).min(texts.len());

            // Partition the sub-batch into cache-satisfied and uncached,
            // keeping original indices for recombination.
            let mut uncached: Vec<usize> = Vec::new();
            for i in chunk_start..chunk_end {
                match self.cache_lookup(&texts[i]).await {
                    Some((provider_id, vector)) => {
                        self.metrics.record_cache_hit();
                        slots[i] = Some(EmbeddingResult {
                            text: texts[i].clone(),
                            vector,
                            model_name: self.model_name_for(&provider_id),
                            provider_id,
                            cached: true,
                            metadata: None,
                        });
                    }
                    None => {
                        self.metrics.record_cache_miss();
                        uncached.push(i);
                    }
                }
            }

            if uncached.is_empty() {
                continue;
            }

            let subset: Vec<String> = uncached.iter().map(|&i| texts[i].clone()).collect();
            match self.embed_uncached(&subset).await {
                ChainOutcome::Embedded {
                    provider_id,
                    model_name,
                    vectors,
                    error,
                } => {
                    for (&i, vector) in uncached.iter().zip(vectors) {
                        slots[i] = Some(EmbeddingResult {
                            text: texts[i].clone(),
                            vector,
                            provider_id: provider_id.clone(),
                            model_name: model_name.clone(),
                            cached: false,
                            metadata: error_metadata(error.clone()),
                        });
                    }
                }
                ChainOutcome::Exhausted { last_error } => {
                    for &i in &uncached {
                        slots[i] = Some(self.degraded_result(&texts[i], &last_error));
                    }
                }
            }
        }

        slots
            .into_iter()
            .zip(texts)
            .map(|(slot, text)| {
                slot.unwrap_or_else(|| self.degraded_result(text, "batch slot left unresolved"))
            })
            .collect()
    }

    /// Probe the cache across the chain in preference order. The first hit
    /// wins: chain order decides which provider's cached vector is
    /// preferred when several exist.
    async fn cache_lookup(&self, text: &str) -> Option<(String, Embedding)> {
        for provider in self.chain.iter() {
            if let Some(vector) = self.cache.get(provider.id(), text).await {
                return Some((provider.id().to_string(), vector));
            }
        }
        None
    }

    /// Walk the fallback chain for an uncached subset. The subset succeeds
    /// or fails together per provider attempt; on failure or timeout the
    /// *entire* subset moves to the next provider.
    async fn embed_uncached(&self, texts: &[String]) -> ChainOutcome {
        let deadline = Duration::from_secs_f64(self.config.timeout_secs);
        let mut last_error: Option<String> = None;

        for provider in self.chain.iter() {
            match timeout(deadline, provider.embed(texts)).await {
                Ok(Ok(vectors)) if vectors.len() == texts.len() => {
                    for (text, vector) in texts.iter().zip(&vectors) {
                        self.cache.put(provider.id(), text, vector.clone()).await;
                    }
                    self.metrics.record_usage(provider.id(), texts.len() as u64);

                    let info = provider.model_info();
                    debug!(
                        provider = %info.provider_id,
                        count = vectors.len(),
                        "Embedded uncached subset"
                    );
                    // A mock answer after real failures is a degraded
                    // result; flag it with the error that forced it.
                    let error = if info.provider_id == "mock" {
                        last_error
                    } else {
                        None
                    };
                    return ChainOutcome::Embedded {
                        provider_id: info.provider_id,
                        model_name: info.name,
                        vectors,
                        error,
                    };
                }
                Ok(Ok(vectors)) => {
                    let e = format!(
                        "provider '{}' returned {} vectors for {} texts",
                        provider.id(),
                        vectors.len(),
                        texts.len()
                    );
                    warn!("{e}; trying next provider");
                    last_error = Some(e);
                }
                Ok(Err(e)) => {
                    warn!(
                        provider = provider.id(),
                        error = %e,
                        "Provider failed, trying next"
                    );
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    let e = EmbeddingError::Timeout {
                        provider: provider.id().to_string(),
                        secs: self.config.timeout_secs,
                    };
                    warn!(provider = provider.id(), "{e}; trying next provider");
                    last_error = Some(e.to_string());
                }
            }
        }

        // Only reachable if every provider, mock included, misbehaved.
        self.metrics.record_error();
        ChainOutcome::Exhausted {
            last_error: last_error
                .unwrap_or_else(|| EmbeddingError::AllProvidersExhausted.to_string()),
        }
    }

    /// Last-resort mock substitution, annotated with the error that forced
    /// it so callers can detect the degraded fidelity.
    fn degraded_result(&self, text: &str, last_error: &str) -> EmbeddingResult {
        let info = self.mock.model_info();
        EmbeddingResult {
            text: text.to_string(),
            vector: self.mock.vector(text),
            provider_id: info.provider_id,
            model_name: info.name,
            cached: false,
            metadata: Some(HashMap::from([(
                "error".to_string(),
                last_error.to_string(),
            )])),
        }
    }

    fn model_name_for(&self, provider_id: &str) -> String {
        self.chain
            .iter()
            .find(|p| p.id() == provider_id)
            .map(|p| p.model_info().name)
            .unwrap_or_else(|| provider_id.to_string())
    }

    /// Probe the cache backend and every provider in the chain.
    pub async fn health_check(&self) -> HealthReport {
        let probe = vec!["health check".to_string()];
        let deadline = Duration::from_secs_f64(self.config.health_timeout_secs);

        let mut probes = Vec::with_capacity(self.chain.len());
        for provider in self.chain.iter() {
            let (responsive, error) = match timeout(deadline, provider.embed(&probe)).await {
                Ok(Ok(_)) => (true, None),
                Ok(Err(e)) => (false, Some(e.to_string())),
                Err(_) => (
                    false,
                    Some(format!(
                        "probe timed out after {}s",
                        self.config.health_timeout_secs
                    )),
                ),
            };
            probes.push(ProviderHealth {
                provider_id: provider.id().to_string(),
                responsive,
                error,
            });
        }

        let cache_ok = if self.cache.is_enabled() {
            Some(self.cache.ping().await)
        } else {
            None
        };

        HealthReport::aggregate(probes, cache_ok)
    }

    /// Read-only snapshot of the pipeline counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The fallback chain, in preference order.
    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    /// Release resources: flush the cache if it persists to disk.
    pub async fn close(&self) {
        self.cache.flush().await;
        info!("Embedding pipeline closed");
    }
}

fn error_metadata(error: Option<String>) -> Option<HashMap<String, String>> {
    error.map(|e| HashMap::from([("error".to_string(), e)]))
}
