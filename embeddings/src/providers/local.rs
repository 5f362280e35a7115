//! Local in-process embedding provider.
//!
//! The model (a vocabulary plus a deterministic bag-of-tokens projection) is
//! loaded lazily on the first `embed` call. Loading is single-flight: every
//! concurrent caller awaits the same in-flight load. The outcome, success or
//! failure, is memoized for the process lifetime, so a missing model file
//! fails fast on every later call instead of re-reading disk. Inference runs
//! under `spawn_blocking` so it never stalls the executor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, ModelInfo};

/// Embedding provider backed by an in-process model.
pub struct LocalProvider {
    /// Path to the vocabulary file (one token per line).
    vocab_path: PathBuf,

    /// Output dimensionality.
    dimensions: usize,

    /// Memoized load outcome shared across concurrent callers.
    model: OnceCell<std::result::Result<Arc<LocalModel>, String>>,
}

impl LocalProvider {
    /// Create a local provider reading its vocabulary from `vocab_path`.
    /// The file is not touched until the first `embed` call.
    pub fn new(vocab_path: impl AsRef<Path>, dimensions: usize) -> Self {
        Self {
            vocab_path: vocab_path.as_ref().to_path_buf(),
            dimensions,
            model: OnceCell::new(),
        }
    }

    /// Await the shared model handle, triggering the load on first use.
    async fn model(&self) -> Result<Arc<LocalModel>> {
        let outcome = self
            .model
            .get_or_init(|| async {
                match LocalModel::load(&self.vocab_path, self.dimensions).await {
                    Ok(model) => {
                        info!(
                            tokens = model.vocab.len(),
                            path = %self.vocab_path.display(),
                            "Loaded local embedding model"
                        );
                        Ok(Arc::new(model))
                    }
                    Err(e) => {
                        warn!(
                            path = %self.vocab_path.display(),
                            error = %e,
                            "Local model load failed; provider marked unavailable"
                        );
                        Err(e.to_string())
                    }
                }
            })
            .await;

        match outcome {
            Ok(model) => Ok(Arc::clone(model)),
            Err(e) => Err(EmbeddingError::ProviderUnavailable(format!(
                "local model failed to load: {e}"
            ))),
        }
    }

    fn model_name(&self) -> String {
        self.vocab_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "local-bow".to_string())
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn id(&self) -> &str {
        "local"
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::new("local", self.model_name(), Some(self.dimensions))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let model = self.model().await?;
        let texts = texts.to_vec();

        debug!(count = texts.len(), "Running local inference");

        tokio::task::spawn_blocking(move || {
            texts.iter().map(|t| model.project(t)).collect::<Vec<_>>()
        })
        .await
        .map_err(|e| EmbeddingError::ProviderUnavailable(format!("local inference panicked: {e}")))
    }
}

/// Vocabulary-backed bag-of-tokens model.
struct LocalModel {
    vocab: HashMap<String, u64>,
    dimensions: usize,
}

impl LocalModel {
    async fn load(path: &Path, dimensions: usize) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;

        let vocab: HashMap<String, u64> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, token)| (token.to_lowercase(), i as u64))
            .collect();

        if vocab.is_empty() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "vocabulary at {} is empty",
                path.display()
            )));
        }

        Ok(Self { vocab, dimensions })
    }

    /// Project a text into the embedding space: each token contributes a
    /// seeded pseudo-random direction, summed and L2-normalized.
    fn project(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text.to_lowercase().split_whitespace() {
            let seed = self
                .vocab
                .get(token)
                .copied()
                .unwrap_or_else(|| fnv1a(token));

            let mut state = seed.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1);
            for slot in vector.iter_mut() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                *slot += ((state >> 33) as f32) / (u32::MAX as f32) * 2.0 - 1.0;
            }
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

fn fnv1a(token: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn vocab_file(tokens: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for token in tokens {
            writeln!(file, "{token}").unwrap();
        }
        file
    }

    #[tokio::test]
    async fn test_lazy_load_and_embed() {
        let file = vocab_file(&["hello", "world"]);
        let provider = LocalProvider::new(file.path(), 32);

        let texts = vec!["hello world".to_string()];
        let result = provider.embed(&texts).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].len(), 32);
    }

    #[tokio::test]
    async fn test_deterministic_across_calls() {
        let file = vocab_file(&["alpha", "beta"]);
        let provider = LocalProvider::new(file.path(), 16);

        let texts = vec!["alpha beta gamma".to_string()];
        let a = provider.embed(&texts).await.unwrap();
        let b = provider.embed(&texts).await.unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_missing_vocab_fails_every_call() {
        let provider = LocalProvider::new("/nonexistent/vocab.txt", 16);
        let texts = vec!["hello".to_string()];

        let first = provider.embed(&texts).await.unwrap_err();
        assert!(matches!(first, EmbeddingError::ProviderUnavailable(_)));

        // Failure is memoized: the second call fails fast the same way.
        let second = provider.embed(&texts).await.unwrap_err();
        assert!(matches!(second, EmbeddingError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let file = vocab_file(&["shared"]);
        let provider = Arc::new(LocalProvider::new(file.path(), 8));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let p = Arc::clone(&provider);
            handles.push(tokio::spawn(async move {
                p.embed(&["shared".to_string()]).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }
}
