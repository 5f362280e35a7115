//! Fallback chain construction.
//!
//! Built once at initialization and immutable for the service lifetime.
//! The configured primary comes first, then the fixed preference order,
//! with mock always present as the tail. Chain order bounds worst-case
//! latency and guarantees every request eventually succeeds.

use std::sync::Arc;

use tracing::info;

use vectra_embeddings::EmbeddingProvider;

/// Fixed global preference order, best first. Mock is handled separately
/// and always appended.
const PREFERENCE_ORDER: [&str; 4] = ["openai", "openrouter", "local", "huggingface"];

/// Ordered, duplicate-free sequence of providers to try.
pub struct FallbackChain {
    providers: Vec<Arc<dyn EmbeddingProvider>>,
}

impl FallbackChain {
    /// Build the chain from the set of successfully constructed providers.
    ///
    /// `providers` must contain a provider with id `"mock"`; the pipeline
    /// constructs one unconditionally. Unknown ids sort after the known
    /// preference order, before mock.
    pub fn build(primary: Option<&str>, providers: Vec<Arc<dyn EmbeddingProvider>>) -> Self {
        let mut ordered: Vec<Arc<dyn EmbeddingProvider>> = Vec::with_capacity(providers.len());

        let mut push = |id: &str, ordered: &mut Vec<Arc<dyn EmbeddingProvider>>| {
            if ordered.iter().any(|p| p.id() == id) {
                return;
            }
            if let Some(provider) = providers.iter().find(|p| p.id() == id) {
                ordered.push(Arc::clone(provider));
            }
        };

        if let Some(primary) = primary {
            push(primary, &mut ordered);
        }

        for id in PREFERENCE_ORDER {
            push(id, &mut ordered);
        }

        // Anything configured but not in the fixed order, mock excepted.
        for provider in &providers {
            if provider.id() != "mock" && !ordered.iter().any(|p| p.id() == provider.id()) {
                ordered.push(Arc::clone(provider));
            }
        }

        push("mock", &mut ordered);

        info!(chain = ?ordered.iter().map(|p| p.id()).collect::<Vec<_>>(), "Built fallback chain");

        Self { providers: ordered }
    }

    /// Providers in preference order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn EmbeddingProvider>> {
        self.providers.iter()
    }

    /// Provider ids in preference order.
    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// A chain is never empty: mock is always a member.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vectra_embeddings::MockProvider;

    use async_trait::async_trait;
    use vectra_embeddings::{Embedding, ModelInfo, Result};

    struct NamedProvider(&'static str);

    #[async_trait]
    impl EmbeddingProvider for NamedProvider {
        fn id(&self) -> &str {
            self.0
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo::new(self.0, "test", None)
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            Ok(texts.iter().map(|_| vec![0.0]).collect())
        }
    }

    fn providers(ids: &[&'static str]) -> Vec<Arc<dyn EmbeddingProvider>> {
        let mut out: Vec<Arc<dyn EmbeddingProvider>> = ids
            .iter()
            .map(|id| Arc::new(NamedProvider(id)) as Arc<dyn EmbeddingProvider>)
            .collect();
        out.push(Arc::new(MockProvider::new()));
        out
    }

    #[test]
    fn test_primary_comes_first() {
        let chain = FallbackChain::build(
            Some("local"),
            providers(&["openai", "local", "huggingface"]),
        );
        assert_eq!(chain.ids(), vec!["local", "openai", "huggingface", "mock"]);
    }

    #[test]
    fn test_preference_order_without_primary() {
        let chain = FallbackChain::build(None, providers(&["huggingface", "openai"]));
        assert_eq!(chain.ids(), vec!["openai", "huggingface", "mock"]);
    }

    #[test]
    fn test_mock_always_last_and_unique() {
        let chain = FallbackChain::build(Some("mock"), providers(&[]));
        assert_eq!(chain.ids(), vec!["mock"]);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_missing_primary_is_skipped() {
        let chain = FallbackChain::build(Some("openai"), providers(&["local"]));
        assert_eq!(chain.ids(), vec!["local", "mock"]);
    }

    #[test]
    fn test_no_duplicates() {
        let chain = FallbackChain::build(
            Some("openai"),
            providers(&["openai", "openrouter", "local", "huggingface"]),
        );
        let ids = chain.ids();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped);
        assert_eq!(ids.last(), Some(&"mock"));
    }
}
