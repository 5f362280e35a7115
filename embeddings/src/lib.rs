//! # Vectra Embeddings
//!
//! This crate provides the embedding provider abstraction and the
//! content-addressed vector cache used by the Vectra pipeline.
//!
//! ## Features
//!
//! - **Provider Abstraction**: One trait, many backends
//! - **Remote Providers**: OpenAI-compatible HTTP APIs (OpenAI, OpenRouter,
//!   HuggingFace)
//! - **Local Provider**: In-process model with lazy, single-flight loading
//! - **Mock Provider**: Deterministic, infallible vectors for tests and
//!   last-resort fallback
//! - **Caching**: TTL-bounded cache keyed by `(provider, text)` fingerprints
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Embeddings Crate                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► EmbeddingCache             │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  Remote / Local / Mock                                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod provider;
pub mod providers;

pub use cache::{CacheStats, EmbeddingCache};
pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, ModelInfo};
pub use providers::local::LocalProvider;
pub use providers::mock::MockProvider;
pub use providers::remote::RemoteProvider;

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Default dimension for mock embeddings.
pub const MOCK_DIMENSION: usize = 384;
