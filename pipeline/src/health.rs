//! Health report types.
//!
//! The pipeline probes the cache backend and every provider in the chain
//! on demand and aggregates the answers into a composite status.

use serde::{Deserialize, Serialize};

/// Composite pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// At least half the providers answer and the cache (if configured) is
    /// reachable.
    Healthy,
    /// Some providers answer, or only the cache is down. The cache is not
    /// on the critical path, so its failure alone never goes below this.
    Degraded,
    /// No provider answers.
    Unhealthy,
}

/// Probe outcome for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Provider id.
    pub provider_id: String,

    /// Whether the provider answered the probe within the deadline.
    pub responsive: bool,

    /// Error message when it did not.
    pub error: Option<String>,
}

/// Aggregated health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Composite status.
    pub status: HealthStatus,

    /// Cache backend reachability; `None` when no cache is configured.
    pub cache_ok: Option<bool>,

    /// Per-provider probe results, in chain order.
    pub providers: Vec<ProviderHealth>,
}

impl HealthReport {
    /// Aggregate per-provider probes and the cache probe into a status.
    pub fn aggregate(providers: Vec<ProviderHealth>, cache_ok: Option<bool>) -> Self {
        let responders = providers.iter().filter(|p| p.responsive).count();

        let mut status = if responders == 0 {
            HealthStatus::Unhealthy
        } else if responders * 2 < providers.len() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        if cache_ok == Some(false) && status == HealthStatus::Healthy {
            status = HealthStatus::Degraded;
        }

        Self {
            status,
            cache_ok,
            providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn probe(id: &str, responsive: bool) -> ProviderHealth {
        ProviderHealth {
            provider_id: id.to_string(),
            responsive,
            error: (!responsive).then(|| "probe failed".to_string()),
        }
    }

    #[test]
    fn test_all_responsive_is_healthy() {
        let report =
            HealthReport::aggregate(vec![probe("openai", true), probe("mock", true)], None);
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_zero_responders_is_unhealthy() {
        let report = HealthReport::aggregate(vec![probe("openai", false)], None);
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_minority_responding_is_degraded() {
        let report = HealthReport::aggregate(
            vec![
                probe("openai", false),
                probe("openrouter", false),
                probe("mock", true),
            ],
            None,
        );
        assert_eq!(report.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_cache_failure_downgrades_to_degraded_only() {
        let report = HealthReport::aggregate(vec![probe("mock", true)], Some(false));
        assert_eq!(report.status, HealthStatus::Degraded);

        // Already unhealthy stays unhealthy; cache cannot make it worse.
        let report = HealthReport::aggregate(vec![probe("openai", false)], Some(false));
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Healthy).unwrap();
        assert_eq!(json, "\"healthy\"");
    }
}
