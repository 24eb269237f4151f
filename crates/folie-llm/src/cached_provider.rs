//! Cached LLM provider wrappers
//!
//! [`CachedProvider`] keeps responses in memory (Moka, TTL based).
//! [`DiskCachedProvider`] stores one JSON file per request so repeated
//! experiment runs can reuse earlier completions.
//!
//! Both key on a SHA-256 of a backend namespace plus the full request
//! (system, prompt, temperature, max_tokens). The disk cache directory
//! outlives any one backend, so its namespace must name the model and
//! endpoint that produced the answers.

use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{LlmError, LlmProvider, LlmRequest, LlmResponse};

/// Configuration for the in-memory LLM cache
#[derive(Debug, Clone)]
pub struct LlmCacheConfig {
    /// Maximum number of cached responses
    pub max_entries: u64,
    /// Time-to-live for cached entries
    pub ttl: Duration,
}

impl Default for LlmCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

/// Cache key for `request` as answered by the backend named `namespace`
pub fn cache_key(namespace: &str, request: &LlmRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"|");
    hasher.update(request.system.as_bytes());
    hasher.update(b"|");
    hasher.update(request.prompt.as_bytes());
    hasher.update(b"|");
    hasher.update(request.temperature.to_be_bytes());
    hasher.update(b"|");
    hasher.update(request.max_tokens.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Hit/miss counters shared by both cache wrappers
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }
}

/// In-memory cached LLM provider wrapper
#[derive(Debug)]
pub struct CachedProvider {
    inner: Arc<dyn LlmProvider>,
    cache: Cache<String, LlmResponse>,
    stats: CacheStats,
}

impl CachedProvider {
    /// Create a cached wrapper around an LLM provider
    pub fn new(provider: Arc<dyn LlmProvider>, config: LlmCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();

        Self {
            inner: provider,
            cache,
            stats: CacheStats::default(),
        }
    }

    /// Create with default configuration
    pub fn wrap(provider: Arc<dyn LlmProvider>) -> Self {
        Self::new(provider, LlmCacheConfig::default())
    }

    /// (hits, misses, hit rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        self.stats.snapshot()
    }
}

#[async_trait]
impl LlmProvider for CachedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let key = cache_key(self.inner.name(), &request);

        if let Some(cached) = self.cache.get(&key).await {
            self.stats.hit();
            tracing::debug!(cache_key = %key, "LLM memory cache hit");
            return Ok(cached);
        }

        self.stats.miss();
        let response = self.inner.complete(request).await?;
        self.cache.insert(key, response.clone()).await;

        Ok(response)
    }
}

/// Default on-disk cache location (`<user cache dir>/folie-a-deux/llm`)
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("folie-a-deux")
        .join("llm")
}

/// On-disk cached LLM provider wrapper
#[derive(Debug)]
pub struct DiskCachedProvider {
    inner: Arc<dyn LlmProvider>,
    dir: PathBuf,
    namespace: String,
    stats: CacheStats,
}

impl DiskCachedProvider {
    /// Cache responses under `dir` (created on first write).
    ///
    /// `namespace` identifies the backend, e.g. `model@api_base`. Wrappers
    /// with different namespaces never see each other's entries, even in the
    /// same directory.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        dir: impl Into<PathBuf>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            inner: provider,
            dir: dir.into(),
            namespace: namespace.into(),
            stats: CacheStats::default(),
        }
    }

    /// (hits, misses, hit rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        self.stats.snapshot()
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    async fn load(&self, key: &str) -> Option<LlmResponse> {
        let bytes = tokio::fs::read(self.entry_path(key)).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Ignoring corrupt disk cache entry");
                None
            }
        }
    }

    async fn store(&self, key: &str, response: &LlmResponse) {
        let write = async {
            tokio::fs::create_dir_all(&self.dir).await?;
            let bytes = serde_json::to_vec(response)?;
            tokio::fs::write(self.entry_path(key), bytes).await?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
        };

        // A failed write only costs a future cache miss
        if let Err(e) = write.await {
            tracing::warn!(cache_key = %key, error = %e, "Failed to write disk cache entry");
        }
    }
}

#[async_trait]
impl LlmProvider for DiskCachedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        let key = cache_key(&self.namespace, &request);

        if let Some(cached) = self.load(&key).await {
            self.stats.hit();
            tracing::debug!(cache_key = %key, "LLM disk cache hit");
            return Ok(cached);
        }

        self.stats.miss();
        let response = self.inner.complete(request).await?;
        self.store(&key, &response).await;

        Ok(response)
    }
}
