//! InterpretationGateway — the cache/admission/provider control flow.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::InterpretationCache;
use crate::fingerprint::{ChartSpec, Fingerprint};
use crate::limiter::{AdmissionController, Tier};
use crate::provider::{GenerationRequest, InterpretationProvider};
use crate::store::DurableStore;
use crate::{Result, UraniaError, telemetry};

/// An interpretation returned to the caller, with quota context for the
/// client to render.
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub text: String,
    pub fingerprint: Fingerprint,
    /// True when served from the ephemeral cache (no generation ran).
    pub from_cache: bool,
    /// Strict-tier quota left for this identity.
    pub remaining: u32,
    /// Strict-tier ceiling.
    pub limit: u32,
    /// When the identity's strict window resets.
    pub reset_at: DateTime<Utc>,
}

/// Previously produced text found by [`InterpretationGateway::lookup`].
#[derive(Debug, Clone)]
pub struct StoredInterpretation {
    pub text: String,
    pub fingerprint: Fingerprint,
    /// True when the ephemeral cache supplied the text; false when the
    /// durable store did (durable always wins when both exist).
    pub from_cache: bool,
}

/// Orchestrates fingerprinting, the ephemeral cache, admission control,
/// and the AI provider.
///
/// Control flow for [`generate`](Self::generate): fingerprint → cache
/// lookup → on hit, return without touching the limiter or provider → on
/// miss, strict-tier admission check → provider call → cache write.
/// Admission quota is consumed only when real generation happens.
///
/// There is deliberately no single-flight map: two concurrent misses for
/// the same fingerprint may both generate, and last-write-wins on the
/// cache keeps that safe.
pub struct InterpretationGateway {
    cache: InterpretationCache,
    limiter: AdmissionController,
    provider: Arc<dyn InterpretationProvider>,
    store: Option<Arc<dyn DurableStore>>,
}

impl InterpretationGateway {
    pub(crate) fn new(
        cache: InterpretationCache,
        limiter: AdmissionController,
        provider: Arc<dyn InterpretationProvider>,
        store: Option<Arc<dyn DurableStore>>,
    ) -> Self {
        Self {
            cache,
            limiter,
            provider,
            store,
        }
    }

    /// The admission controller, for route-level gating of read paths.
    pub fn limiter(&self) -> &AdmissionController {
        &self.limiter
    }

    /// Produce interpretation text for a chart, generating only on a
    /// cache miss that passes admission control.
    pub async fn generate(
        &self,
        identity: &str,
        request: &GenerationRequest,
    ) -> Result<Interpretation> {
        let fingerprint = request.chart.fingerprint()?;

        if let Some(entry) = self.cache.get(&fingerprint).await {
            // No generation, no quota consumed; report current quota so
            // the client can still render its countdown.
            let quota = self.limiter.status(identity, Tier::Strict).await;
            debug!(%fingerprint, "interpretation served from cache");
            return Ok(Interpretation {
                text: entry.text,
                fingerprint,
                from_cache: true,
                remaining: quota.remaining,
                limit: quota.limit,
                reset_at: quota.reset_at,
            });
        }

        let decision = self.limiter.check(identity, Tier::Strict).await;
        if !decision.allowed {
            return Err(UraniaError::RateLimitExceeded {
                limit: decision.limit,
                reset_at: decision.reset_at,
            });
        }

        let started = Instant::now();
        let result = self.provider.generate(request).await;
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "operation" => "generate")
            .record(started.elapsed().as_secs_f64());
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "operation" => "generate",
            "status" => if result.is_ok() { "ok" } else { "error" },
        )
        .increment(1);

        // A failed generation leaves the cache untouched — no negative
        // caching; the caller sees a retryable error.
        let text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!(%fingerprint, error = %e, "interpretation generation failed");
                return Err(e);
            }
        };
        self.cache.put(&fingerprint, &text).await;

        Ok(Interpretation {
            text,
            fingerprint,
            from_cache: false,
            remaining: decision.remaining,
            limit: decision.limit,
            reset_at: decision.reset_at,
        })
    }

    /// Fetch existing text for a chart without generating: durable store
    /// first, then the ephemeral cache.
    pub async fn lookup(&self, chart: &ChartSpec) -> Result<Option<StoredInterpretation>> {
        let fingerprint = chart.fingerprint()?;

        if let Some(store) = &self.store
            && let Some(text) = store.load(&fingerprint).await?
        {
            return Ok(Some(StoredInterpretation {
                text,
                fingerprint,
                from_cache: false,
            }));
        }

        Ok(self
            .cache
            .get(&fingerprint)
            .await
            .map(|entry| StoredInterpretation {
                text: entry.text,
                fingerprint: fingerprint.clone(),
                from_cache: true,
            }))
    }

    /// Persist interpretation text durably, then scrub the ephemeral copy.
    ///
    /// Invalidation is best-effort: its failure is logged and never rolls
    /// back the save — a surviving ephemeral entry is a performance
    /// nuisance bounded by its TTL, not a correctness bug, because read
    /// paths prefer durable storage.
    pub async fn save(&self, fingerprint: &Fingerprint, text: &str) -> Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| UraniaError::Configuration("no durable store configured".into()))?;

        store.save(fingerprint, text).await?;
        self.on_persisted(fingerprint).await;
        Ok(())
    }

    /// Delete a durable interpretation, scrubbing the ephemeral copy too
    /// so it cannot resurface after the delete.
    pub async fn discard(&self, fingerprint: &Fingerprint) -> Result<()> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| UraniaError::Configuration("no durable store configured".into()))?;

        store.delete(fingerprint).await?;
        self.on_persisted(fingerprint).await;
        Ok(())
    }

    /// Best-effort ephemeral invalidation after a durable write.
    ///
    /// Also the hook for deployments where persistence happens in another
    /// process: notify the gateway and the ephemeral copy is scrubbed.
    pub async fn on_persisted(&self, fingerprint: &Fingerprint) {
        match self.cache.invalidate(fingerprint).await {
            Ok(()) => {
                metrics::counter!(telemetry::CACHE_INVALIDATIONS_TOTAL).increment(1);
            }
            Err(e) => {
                warn!(%fingerprint, error = %e, "ephemeral invalidation failed after durable write");
            }
        }
    }
}
