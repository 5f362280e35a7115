//! The embedding provider abstraction.
//!
//! A provider turns a batch of texts into a batch of vectors. Concrete
//! implementations live in [`crate::providers`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Embedding;
use crate::error::Result;

/// Describes the model behind a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Stable provider id ("openai", "openrouter", "local", "huggingface",
    /// "mock").
    pub provider_id: String,

    /// Model name as reported to callers.
    pub name: String,

    /// Output dimensionality, when known ahead of the first call.
    pub dimensions: Option<usize>,
}

impl ModelInfo {
    /// Create a new model descriptor.
    pub fn new(
        provider_id: impl Into<String>,
        name: impl Into<String>,
        dimensions: Option<usize>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            name: name.into(),
            dimensions,
        }
    }
}

/// Trait for embedding providers.
///
/// Implementations must return exactly one vector per input text, in input
/// order. Providers are stateless after construction and safe to share
/// across tasks.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable provider id used for cache scoping and fallback ordering.
    fn id(&self) -> &str;

    /// Model name, dimensionality, and id.
    fn model_info(&self) -> ModelInfo;

    /// Generate one embedding per input text, preserving order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>>;
}
