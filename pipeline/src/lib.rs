//! # Vectra Pipeline
//!
//! The resilient embedding pipeline: an ordered fallback chain of providers
//! behind a content-addressed cache, with per-call timeouts, health probes,
//! and process-wide metrics.
//!
//! Requests never fail outright. When every remote provider is down, the
//! deterministic mock provider at the tail of the chain still answers, and
//! the result is flagged so callers can detect the degraded fidelity.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embedding Pipeline                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  caller ──► EmbeddingPipeline ──► EmbeddingCache (read)         │
//! │                    │ miss                                        │
//! │                    ▼                                             │
//! │             FallbackChain ──► provider.embed() ──► cache (write)│
//! │                    │                                             │
//! │                    ▼                                             │
//! │             Metrics update ──► EmbeddingResult                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vectra_pipeline::{EmbeddingPipeline, PipelineConfig};
//!
//! let pipeline = EmbeddingPipeline::new(PipelineConfig::from_env()).await?;
//!
//! let result = pipeline.embed_text("the quick brown fox").await;
//! assert_eq!(result.vector.len() > 0, true);
//!
//! let batch = pipeline.embed_batch(&texts).await;
//! pipeline.close().await;
//! ```

pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod metrics;

pub use chain::FallbackChain;
pub use config::{CacheConfig, PipelineConfig};
pub use engine::{EmbeddingPipeline, EmbeddingResult};
pub use error::{PipelineError, Result};
pub use health::{HealthReport, HealthStatus, ProviderHealth};
pub use metrics::MetricsSnapshot;

// Re-export from the embeddings crate for convenience
pub use vectra_embeddings::{Embedding, EmbeddingProvider, MockProvider, ModelInfo};
