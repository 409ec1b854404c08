//! Builder for configuring gateway instances

use std::sync::Arc;

use super::InterpretationGateway;
use crate::cache::{CacheBackend, CacheConfig, InterpretationCache};
use crate::limiter::{AdmissionController, LimiterConfig};
use crate::provider::{InterpretationProvider, RetryConfig, RetryingProvider};
use crate::store::DurableStore;
use crate::{Result, UraniaError};

/// Main entry point for creating gateway instances.
pub struct Urania;

impl Urania {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> UraniaBuilder {
        UraniaBuilder::new()
    }
}

/// Builder for configuring gateway instances.
///
/// All configuration is explicit and injected here once at construction —
/// there is no module-level mutable state. An interpretation provider is
/// required; everything else has defaults.
pub struct UraniaBuilder {
    cache: CacheConfig,
    limits: LimiterConfig,
    retry: RetryConfig,
    provider: Option<Arc<dyn InterpretationProvider>>,
    store: Option<Arc<dyn DurableStore>>,
    cache_backend: Option<Arc<dyn CacheBackend>>,
}

impl UraniaBuilder {
    pub fn new() -> Self {
        Self {
            cache: CacheConfig::default(),
            limits: LimiterConfig::default(),
            retry: RetryConfig::default(),
            provider: None,
            store: None,
            cache_backend: None,
        }
    }

    /// Set the interpretation cache configuration (enabled, TTL, size).
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Set the per-tier admission limits.
    pub fn limits(mut self, config: LimiterConfig) -> Self {
        self.limits = config;
        self
    }

    /// Set the provider retry policy.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Set the AI interpretation provider. Required.
    pub fn provider(mut self, provider: Arc<dyn InterpretationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the durable store for saved interpretations.
    ///
    /// Without one, `save`/`discard` return a configuration error and
    /// `lookup` consults only the ephemeral cache.
    pub fn durable_store(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default in-memory cache backend (e.g. with a shared
    /// one for multi-instance deployments).
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<InterpretationGateway> {
        let provider = self.provider.ok_or(UraniaError::NoProvider)?;
        let provider: Arc<dyn InterpretationProvider> =
            Arc::new(RetryingProvider::new(provider, self.retry));

        let cache = match self.cache_backend {
            Some(backend) => InterpretationCache::with_backend(&self.cache, backend),
            None => InterpretationCache::new(&self.cache),
        };

        let limiter = AdmissionController::new(self.limits);

        Ok(InterpretationGateway::new(
            cache, limiter, provider, self.store,
        ))
    }
}

impl Default for UraniaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
