//! TTL-bounded ephemeral store for generated interpretation text.
//!
//! [`InterpretationCache`] maps a [`Fingerprint`] to previously generated
//! text so a repeated request for the same chart configuration returns
//! without touching the AI provider. Entries are a pre-save convenience,
//! not a source of truth: once text is persisted durably, the gateway
//! invalidates the ephemeral copy.
//!
//! # Architecture
//!
//! The cache sits in [`InterpretationGateway`](crate::InterpretationGateway),
//! above admission control and the provider. A cache hit bypasses the
//! rate limiter, retry logic, and provider metrics entirely — no
//! generation occurs, so no quota is consumed. Hit/miss metrics are
//! emitted separately.
//!
//! # Concurrency
//!
//! Concurrent `put` calls for the same fingerprint are last-write-wins.
//! The store does NOT provide at-most-one-generation; two concurrent
//! misses may both generate. That is duplicate work, not a correctness
//! violation — the final cached value is the same semantic content for
//! the same fingerprint. Single-flight coordination, if ever needed,
//! belongs above this store.
//!
//! # Failure policy
//!
//! [`CacheBackend`] is fallible so shared backends can surface outages.
//! The wrapper absorbs them: `get` degrades to a miss, `put` and
//! `invalidate` to no-ops, each logged at warn with the fingerprint. An
//! unreachable cache makes every request regenerate; it never fails one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::warn;

use crate::fingerprint::Fingerprint;
use crate::{Result, telemetry};

/// Configuration for the interpretation cache.
///
/// Constructed once at process start and injected into the gateway
/// builder — no module-level flags.
///
/// ```rust
/// # use urania::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .ttl(Duration::from_secs(12 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Global switch. When false, `get` always reports absent and `put`
    /// is a no-op; callers never special-case this. Default: true.
    pub enabled: bool,
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 24 hours.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable caching globally.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// A cached interpretation entry.
///
/// Created on a cache miss after successful generation; never mutated in
/// place — a new generation for the same fingerprint replaces it
/// wholesale.
#[derive(Debug, Clone)]
pub struct CachedInterpretation {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedInterpretation {
    /// Build an entry stamped now, expiring after `ttl`.
    pub fn new(text: impl Into<String>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        let expires_at = created_at
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        Self {
            text: text.into(),
            created_at,
            expires_at,
        }
    }

    /// Whether the entry's age exceeds its TTL.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Storage seam for the interpretation cache.
///
/// Implementations only store and retrieve; all policy (enabled flag,
/// TTL-at-read, failure absorption) lives in [`InterpretationCache`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CachedInterpretation>>;
    async fn put(&self, fingerprint: &Fingerprint, entry: CachedInterpretation) -> Result<()>;
    async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<()>;
}

/// Default moka-backed backend.
///
/// Bounded LRU with the configured TTL doubling as background space
/// reclamation; correctness does not depend on it — the wrapper's lazy
/// expiry check at read time is authoritative.
pub struct InMemoryBackend {
    cache: Cache<String, CachedInterpretation>,
}

impl InMemoryBackend {
    /// Create a backend sized and aged per the config.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Number of entries currently resident.
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Whether the backend holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<CachedInterpretation>> {
        Ok(self.cache.get(fingerprint.as_str()).await)
    }

    async fn put(&self, fingerprint: &Fingerprint, entry: CachedInterpretation) -> Result<()> {
        self.cache.insert(fingerprint.as_str().to_owned(), entry).await;
        Ok(())
    }

    async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<()> {
        self.cache.invalidate(fingerprint.as_str()).await;
        Ok(())
    }
}

/// Policy-absorbing front of the interpretation cache.
///
/// See module docs for the enabled/TTL/failure semantics.
pub struct InterpretationCache {
    enabled: bool,
    ttl: Duration,
    backend: Arc<dyn CacheBackend>,
}

impl InterpretationCache {
    /// Create a cache with the default in-memory backend.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_backend(config, Arc::new(InMemoryBackend::new(config)))
    }

    /// Create a cache over a custom backend.
    pub fn with_backend(config: &CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.ttl,
            backend,
        }
    }

    /// The configured time-to-live for new entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up cached text for a fingerprint.
    ///
    /// Returns `None` when caching is disabled, on a genuine miss, when
    /// the entry's TTL has elapsed (the stale entry is opportunistically
    /// evicted), or when the backend is unreachable. Emits hit/miss
    /// metrics for enabled lookups.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CachedInterpretation> {
        if !self.enabled {
            return None;
        }

        let entry = match self.backend.get(fingerprint).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%fingerprint, error = %e, "cache read failed, treating as miss");
                None
            }
        };

        match entry {
            Some(entry) if !entry.is_expired(Utc::now()) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(entry)
            }
            Some(_) => {
                // Lazy expiry: evict on read, no background sweep needed.
                if let Err(e) = self.backend.invalidate(fingerprint).await {
                    warn!(%fingerprint, error = %e, "failed to evict expired entry");
                }
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Store generated text under a fingerprint.
    ///
    /// No-op when caching is disabled. Last-write-wins under concurrency.
    /// Backend failures are logged and swallowed — a lost write costs one
    /// future regeneration, nothing more.
    pub async fn put(&self, fingerprint: &Fingerprint, text: impl Into<String>) {
        if !self.enabled {
            return;
        }
        let entry = CachedInterpretation::new(text, self.ttl);
        if let Err(e) = self.backend.put(fingerprint, entry).await {
            warn!(%fingerprint, error = %e, "cache write failed");
        }
    }

    /// Remove the entry for a fingerprint.
    ///
    /// Returns the backend error (for the invalidator's logging) but
    /// callers treat it as best-effort hygiene: an entry that survives
    /// here still dies at its TTL.
    pub async fn invalidate(&self, fingerprint: &Fingerprint) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.backend.invalidate(fingerprint).await
    }
}
