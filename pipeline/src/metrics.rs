//! Process-wide pipeline metrics.
//!
//! Counters are owned by the pipeline, updated through atomic increments,
//! and exposed only as immutable snapshots. Per-provider usage slots are
//! fixed at initialization from the fallback chain, so recording is
//! lock-free.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Internal counters. Reset only by restarting the service.
pub(crate) struct Metrics {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    errors: AtomicU64,
    provider_usage: Vec<(String, AtomicU64)>,
}

impl Metrics {
    /// Create counters with one usage slot per chain member.
    pub(crate) fn new(provider_ids: &[&str]) -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            provider_usage: provider_ids
                .iter()
                .map(|id| ((*id).to_string(), AtomicU64::new(0)))
                .collect(),
        }
    }

    pub(crate) fn record_requests(&self, n: u64) {
        self.total_requests.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_usage(&self, provider_id: &str, n: u64) {
        if let Some((_, counter)) = self
            .provider_usage
            .iter()
            .find(|(id, _)| id == provider_id)
        {
            counter.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Immutable snapshot of all counters.
    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests,
            cache_hits,
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_hit_rate: cache_hits as f64 / total_requests.max(1) as f64,
            errors: self.errors.load(Ordering::Relaxed),
            provider_usage: self
                .provider_usage
                .iter()
                .map(|(id, counter)| (id.clone(), counter.load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

/// Read-only view of the pipeline counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total texts the pipeline was asked to embed.
    pub total_requests: u64,

    /// Requests satisfied from cache.
    pub cache_hits: u64,

    /// Requests that required a provider call.
    pub cache_misses: u64,

    /// `cache_hits / max(total_requests, 1)`.
    pub cache_hit_rate: f64,

    /// Times the whole chain was exhausted and mock was forced.
    pub errors: u64,

    /// Texts embedded per provider.
    pub provider_usage: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new(&["openai", "mock"]);

        metrics.record_requests(3);
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_cache_miss();
        metrics.record_usage("openai", 2);
        metrics.record_usage("mock", 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 2);
        assert_eq!(snapshot.provider_usage["openai"], 2);
        assert_eq!(snapshot.provider_usage["mock"], 1);
        assert_eq!(snapshot.errors, 0);
    }

    #[test]
    fn test_hit_rate_never_divides_by_zero() {
        let metrics = Metrics::new(&[]);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hit_rate, 0.0);
    }

    #[test]
    fn test_unknown_provider_usage_ignored() {
        let metrics = Metrics::new(&["mock"]);
        metrics.record_usage("nope", 5);
        assert!(metrics.snapshot().provider_usage.get("nope").is_none());
    }
}
