//! OpenAI-compatible remote embedding provider.
//!
//! OpenAI, OpenRouter, and the HuggingFace router all speak the same wire
//! shape, so one struct covers all three. Each `embed` call is a single
//! HTTP POST to `{base}/embeddings`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, ModelInfo};

/// A remote embedding provider speaking the OpenAI embeddings API.
pub struct RemoteProvider {
    /// Stable provider id.
    id: String,

    /// API base URL, without trailing slash.
    base_url: String,

    /// Model identifier sent on the wire.
    model: String,

    /// Bearer token.
    api_key: String,

    /// Output dimensionality, when the model declares one.
    dimensions: Option<usize>,

    /// HTTP client.
    client: reqwest::Client,
}

impl RemoteProvider {
    /// OpenAI's embeddings API.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            id: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: api_key.into(),
            dimensions: Some(1536),
            client: reqwest::Client::new(),
        }
    }

    /// OpenRouter's OpenAI-compatible embeddings endpoint.
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self {
            id: "openrouter".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/text-embedding-3-small".to_string(),
            api_key: api_key.into(),
            dimensions: Some(1536),
            client: reqwest::Client::new(),
        }
    }

    /// HuggingFace's OpenAI-compatible router. Dimensions depend on the
    /// chosen model and are unknown until the first successful call.
    pub fn huggingface(api_key: impl Into<String>) -> Self {
        Self {
            id: "huggingface".to_string(),
            base_url: "https://router.huggingface.co/v1".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            api_key: api_key.into(),
            dimensions: None,
            client: reqwest::Client::new(),
        }
    }

    /// Override the base URL (tests point this at a local server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::new(self.id.clone(), self.model.clone(), self.dimensions)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = %self.id,
            count = texts.len(),
            "Requesting embeddings with model: {}",
            self.model
        );

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
            "encoding_format": "float",
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ProviderUnavailable(format!(
                "{}: status {status}: {error_text}",
                self.id
            )));
        }

        let result: WireResponse = response.json().await?;

        if result.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        let embeddings: Vec<Embedding> =
            result.data.into_iter().map(|item| item.embedding).collect();

        info!(
            provider = %self.id,
            count = embeddings.len(),
            "Generated remote embeddings"
        );

        Ok(embeddings)
    }
}

/// Wire response format shared by all OpenAI-compatible APIs.
#[derive(Debug, Deserialize)]
struct WireResponse {
    data: Vec<WireEmbedding>,
}

#[derive(Debug, Deserialize)]
struct WireEmbedding {
    embedding: Vec<f32>,
}
