//! Error types for the embeddings crate.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur while generating or caching embeddings.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The provider rejected the call or could not be reached.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider call exceeded its deadline.
    #[error("provider '{provider}' timed out after {secs}s")]
    Timeout { provider: String, secs: f64 },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The provider answered with something we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Every provider in a fallback chain failed. The mock provider cannot
    /// fail, so a well-formed chain never reaches this.
    #[error("all embedding providers exhausted")]
    AllProvidersExhausted,
}
