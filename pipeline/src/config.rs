//! Configuration for the embedding pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the embedding pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Preferred provider id, tried first when present in the constructed
    /// set ("openai", "openrouter", "local", "huggingface", "mock").
    pub primary_provider: Option<String>,

    /// OpenAI API key. Absent key means the provider is simply not built.
    pub openai_api_key: Option<String>,

    /// OpenRouter API key.
    pub openrouter_api_key: Option<String>,

    /// HuggingFace API key.
    pub huggingface_api_key: Option<String>,

    /// Vocabulary file for the local provider. Unset means no local
    /// provider.
    pub local_vocab_path: Option<PathBuf>,

    /// Local provider output dimension.
    pub local_dimensions: usize,

    /// Mock provider output dimension.
    pub mock_dimensions: usize,

    /// Cache configuration.
    pub cache: CacheConfig,

    /// Maximum texts per provider call; larger batches are split.
    pub max_batch_size: usize,

    /// Per-provider-call timeout in seconds. Fractional values are allowed.
    pub timeout_secs: f64,

    /// Per-provider health probe timeout in seconds.
    pub health_timeout_secs: f64,
}

impl PipelineConfig {
    /// Create a configuration with default values and no credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read credentials and settings from the environment.
    pub fn from_env() -> Self {
        let mut cache = CacheConfig::default();
        if let Some(ttl) = std::env::var("VECTRA_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            cache.ttl_secs = ttl;
        }

        Self {
            primary_provider: std::env::var("VECTRA_PRIMARY_PROVIDER").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok(),
            huggingface_api_key: std::env::var("HUGGINGFACE_API_KEY").ok(),
            local_vocab_path: std::env::var("VECTRA_LOCAL_VOCAB").ok().map(PathBuf::from),
            cache,
            ..Self::default()
        }
    }

    /// Set the primary provider.
    pub fn with_primary(mut self, provider: impl Into<String>) -> Self {
        self.primary_provider = Some(provider.into());
        self
    }

    /// Set the OpenAI API key.
    pub fn with_openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Set the OpenRouter API key.
    pub fn with_openrouter_key(mut self, key: impl Into<String>) -> Self {
        self.openrouter_api_key = Some(key.into());
        self
    }

    /// Set the HuggingFace API key.
    pub fn with_huggingface_key(mut self, key: impl Into<String>) -> Self {
        self.huggingface_api_key = Some(key.into());
        self
    }

    /// Set the local provider vocabulary path.
    pub fn with_local_vocab(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_vocab_path = Some(path.into());
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the maximum sub-batch size.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Set the cache configuration.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary_provider: None,
            openai_api_key: None,
            openrouter_api_key: None,
            huggingface_api_key: None,
            local_vocab_path: None,
            local_dimensions: 384,
            mock_dimensions: 384,
            cache: CacheConfig::default(),
            max_batch_size: 32,
            timeout_secs: 30.0,
            health_timeout_secs: 5.0,
        }
    }
}

/// Configuration for the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled at all.
    pub enabled: bool,

    /// Optional JSON file for persistence across restarts.
    pub path: Option<PathBuf>,

    /// Entry time-to-live in seconds.
    pub ttl_secs: u64,

    /// Maximum number of cached vectors.
    pub max_entries: usize,
}

impl CacheConfig {
    /// Disable caching entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Persist the cache to the given file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the entry TTL.
    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl_secs = secs;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            ttl_secs: 86_400, // 24 hours
            max_entries: 10_000,
        }
    }
}
