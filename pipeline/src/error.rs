//! Error types for the embedding pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur in the embedding pipeline.
///
/// Only construction can fail. Once initialized, `embed_text` and
/// `embed_batch` recover every provider failure internally by fallback
/// substitution and never surface an error to the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No provider could be constructed at all. Configuration bug: the mock
    /// provider alone should always be constructible.
    #[error("no embedding providers could be constructed")]
    NoProviders,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] vectra_embeddings::EmbeddingError),
}
