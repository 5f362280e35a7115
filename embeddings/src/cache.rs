//! Content-addressed embedding cache.
//!
//! Entries are keyed by a SHA-256 fingerprint of `(provider_id, text)`, so
//! two providers never collide on the same text and switching primary
//! providers never silently reuses incompatible-dimension vectors. The
//! cache is optional and never a source of request failure: a disabled
//! cache always misses, and any I/O error is logged and downgraded to a
//! miss or no-op.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::Embedding;

/// Cache entry for an embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Fingerprint of `(provider_id, text)`.
    pub key: String,

    /// Provider the vector came from.
    pub provider_id: String,

    /// The embedding vector.
    pub embedding: Embedding,

    /// Unix seconds at insertion, used for TTL expiry and eviction order.
    pub created_at: u64,
}

/// TTL-bounded embedding cache with optional JSON file persistence.
pub struct EmbeddingCache {
    inner: Option<Inner>,
}

struct Inner {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    cache_path: Option<PathBuf>,
    ttl: Duration,
    max_entries: usize,
}

impl EmbeddingCache {
    /// Create an in-memory cache.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Some(Inner {
                entries: Arc::new(RwLock::new(HashMap::new())),
                cache_path: None,
                ttl,
                max_entries,
            }),
        }
    }

    /// Create a disabled cache: `get` always misses, `put` is a no-op.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Create a cache backed by a JSON file. A missing or unreadable file
    /// starts the cache empty rather than failing construction.
    pub async fn with_persistence(
        path: impl AsRef<Path>,
        ttl: Duration,
        max_entries: usize,
    ) -> Self {
        let path = path.as_ref().to_path_buf();

        let cache = Self {
            inner: Some(Inner {
                entries: Arc::new(RwLock::new(HashMap::new())),
                cache_path: Some(path.clone()),
                ttl,
                max_entries,
            }),
        };

        if path.exists() {
            if let Err(e) = cache.load().await {
                warn!(path = %path.display(), error = %e, "Failed to load cache; starting empty");
            }
        }

        cache
    }

    /// Whether a backend is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Health probe: true when the configured backend is usable.
    pub async fn ping(&self) -> bool {
        match &self.inner {
            None => false,
            Some(inner) => match &inner.cache_path {
                None => true,
                // Persistent backend is usable when its directory is.
                Some(path) => path.parent().is_none_or(Path::exists),
            },
        }
    }

    /// Fingerprint for a `(provider_id, text)` pair.
    fn fingerprint(provider_id: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(provider_id.as_bytes());
        hasher.update(b":");
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up the vector a given provider produced for a text. Expired
    /// entries read as misses and are dropped.
    pub async fn get(&self, provider_id: &str, text: &str) -> Option<Embedding> {
        let inner = self.inner.as_ref()?;
        let key = Self::fingerprint(provider_id, text);

        let expired = {
            let entries = inner.entries.read().await;
            match entries.get(&key) {
                None => return None,
                Some(entry) if entry.created_at + inner.ttl.as_secs() < now_secs() => true,
                Some(entry) => return Some(entry.embedding.clone()),
            }
        };

        if expired {
            inner.entries.write().await.remove(&key);
            debug!(provider = provider_id, "Evicted expired cache entry");
        }
        None
    }

    /// Store a vector under `(provider_id, text)`. Never fails; persistence
    /// errors are logged and swallowed.
    pub async fn put(&self, provider_id: &str, text: &str, embedding: Embedding) {
        let Some(inner) = &self.inner else {
            return;
        };

        let key = Self::fingerprint(provider_id, text);
        let entry = CacheEntry {
            key: key.clone(),
            provider_id: provider_id.to_string(),
            embedding,
            created_at: now_secs(),
        };

        {
            let mut entries = inner.entries.write().await;

            if entries.len() >= inner.max_entries {
                if let Some(oldest_key) = entries
                    .iter()
                    .min_by_key(|(_, v)| v.created_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest_key);
                }
            }

            entries.insert(key, entry);
            debug!(provider = provider_id, "Cached embedding");
        }

        if inner.cache_path.is_some() {
            if let Err(e) = self.save().await {
                warn!(error = %e, "Failed to persist cache");
            }
        }
    }

    /// Flush to disk, for shutdown paths. No-op without persistence.
    pub async fn flush(&self) {
        let persistent = self
            .inner
            .as_ref()
            .is_some_and(|inner| inner.cache_path.is_some());
        if persistent {
            if let Err(e) = self.save().await {
                warn!(error = %e, "Failed to flush cache");
            }
        }
    }

    /// Current entry count and capacity.
    pub async fn stats(&self) -> CacheStats {
        match &self.inner {
            None => CacheStats {
                enabled: false,
                entries: 0,
                max_entries: 0,
            },
            Some(inner) => CacheStats {
                enabled: true,
                entries: inner.entries.read().await.len(),
                max_entries: inner.max_entries,
            },
        }
    }

    async fn save(&self) -> crate::error::Result<()> {
        if let Some(inner) = &self.inner {
            let Some(path) = &inner.cache_path else {
                return Ok(());
            };
            let entries = inner.entries.read().await;
            let values: Vec<&CacheEntry> = entries.values().collect();
            let content = serde_json::to_string(&values)?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }

            fs::write(path, content).await?;
            debug!("Saved {} cache entries to disk", values.len());
        }
        Ok(())
    }

    async fn load(&self) -> crate::error::Result<()> {
        if let Some(inner) = &self.inner {
            let Some(path) = &inner.cache_path else {
                return Ok(());
            };
            let content = fs::read_to_string(path).await?;
            let loaded: Vec<CacheEntry> = serde_json::from_str(&content)?;

            let mut entries = inner.entries.write().await;
            for entry in loaded {
                entries.insert(entry.key.clone(), entry);
            }

            info!("Loaded {} cache entries from disk", entries.len());
        }
        Ok(())
    }
}

/// Statistics about the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Whether a backend is configured.
    pub enabled: bool,

    /// Number of live entries.
    pub entries: usize,

    /// Maximum cache size.
    pub max_entries: usize,
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
