//! Deterministic mock embedding provider.
//!
//! The mock has no external dependencies and can never fail, which makes it
//! the unconditional tail of every fallback chain: even with every remote
//! down, requests still complete. Vectors are derived purely from a hash of
//! the text, so repeated calls are bit-identical.

use async_trait::async_trait;

use crate::error::Result;
use crate::provider::{EmbeddingProvider, ModelInfo};
use crate::{Embedding, MOCK_DIMENSION};

/// Infallible, deterministic embedding provider.
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    /// Create a mock provider with the default dimension.
    pub fn new() -> Self {
        Self {
            dimensions: MOCK_DIMENSION,
        }
    }

    /// Set the output dimension.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Derive the vector for a text. Pure and synchronous; the pipeline
    /// uses this directly on its last-resort path.
    pub fn vector(&self, text: &str) -> Embedding {
        let mut state = djb2(text);
        let mut vector = Vec::with_capacity(self.dimensions);

        for _ in 0..self.dimensions {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            vector.push(((state >> 33) as f32) / (u32::MAX as f32) * 2.0 - 1.0);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::new("mock", "mock-hash-v1", Some(self.dimensions))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

fn djb2(text: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in text.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(byte));
    }
    hash
}
