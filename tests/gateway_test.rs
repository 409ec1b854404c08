//! Tests for [`InterpretationGateway`] — the cache/admission/provider
//! control flow.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use tokio::sync::Mutex;

use urania::cache::{CacheBackend, CachedInterpretation, InMemoryBackend};
use urania::{
    CacheConfig, ChartSpec, DurableStore, Fingerprint, GenerationRequest, InterpretationProvider,
    LimiterConfig, RetryConfig, School, SubjectKey, TierLimit, Urania, UraniaError,
};

/// Provider that counts calls and can be scripted to fail first.
struct ScriptedProvider {
    calls: AtomicUsize,
    fail_first: AtomicUsize,
}

impl ScriptedProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(0),
        })
    }

    fn failing_first(n: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_first: AtomicUsize::new(n),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterpretationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _request: &GenerationRequest) -> urania::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first.load(Ordering::SeqCst) {
            return Err(UraniaError::Api {
                status: 503,
                message: "overloaded".into(),
            });
        }
        Ok(format!("the stars align (call {call})"))
    }
}

/// In-memory durable store fake.
#[derive(Default)]
struct FakeStore {
    rows: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl DurableStore for FakeStore {
    async fn save(&self, fingerprint: &Fingerprint, text: &str) -> urania::Result<()> {
        self.rows
            .lock()
            .await
            .insert(fingerprint.as_str().to_owned(), text.to_owned());
        Ok(())
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> urania::Result<()> {
        self.rows.lock().await.remove(fingerprint.as_str());
        Ok(())
    }

    async fn load(&self, fingerprint: &Fingerprint) -> urania::Result<Option<String>> {
        Ok(self.rows.lock().await.get(fingerprint.as_str()).cloned())
    }
}

/// Backend whose storage is permanently unreachable.
struct UnreachableBackend;

#[async_trait]
impl CacheBackend for UnreachableBackend {
    async fn get(&self, _: &Fingerprint) -> urania::Result<Option<CachedInterpretation>> {
        Err(UraniaError::CacheUnavailable("connection refused".into()))
    }

    async fn put(&self, _: &Fingerprint, _: CachedInterpretation) -> urania::Result<()> {
        Err(UraniaError::CacheUnavailable("connection refused".into()))
    }

    async fn invalidate(&self, _: &Fingerprint) -> urania::Result<()> {
        Err(UraniaError::CacheUnavailable("connection refused".into()))
    }
}

fn natal_chart(id: u64) -> ChartSpec {
    ChartSpec::natal(
        SubjectKey::from_id(id),
        NaiveDate::from_ymd_opt(1990, 6, 1).unwrap(),
    )
}

fn request_for(chart: ChartSpec) -> GenerationRequest {
    GenerationRequest {
        chart,
        chart_data: serde_json::json!({"sun": "gemini"}),
        school: School::Western,
        relationship: None,
    }
}

fn strict_limits(max: u32) -> LimiterConfig {
    LimiterConfig::new().strict(TierLimit::new(max, Duration::from_secs(3600)))
}

#[tokio::test]
async fn miss_generates_then_hit_serves_from_cache() {
    let provider = ScriptedProvider::new();
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));

    let first = gateway.generate("ada", &request).await.unwrap();
    assert!(!first.from_cache);

    let second = gateway.generate("ada", &request).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.text, first.text);

    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn cache_hit_consumes_no_quota() {
    let provider = ScriptedProvider::new();
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .limits(strict_limits(1))
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));

    let first = gateway.generate("ada", &request).await.unwrap();
    assert_eq!(first.remaining, 0);

    // Quota exhausted, but the hit path never reaches admission control.
    let second = gateway.generate("ada", &request).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.remaining, 0);
}

#[tokio::test]
async fn miss_beyond_ceiling_is_rate_limited() {
    let provider = ScriptedProvider::new();
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .limits(strict_limits(1))
        .build()
        .unwrap();

    gateway
        .generate("ada", &request_for(natal_chart(1)))
        .await
        .unwrap();

    // Different chart: cache miss, admission rejects.
    let err = gateway
        .generate("ada", &request_for(natal_chart(2)))
        .await
        .unwrap_err();
    let UraniaError::RateLimitExceeded { limit, reset_at } = err else {
        unreachable!("expected RateLimitExceeded");
    };
    assert_eq!(limit, 1);
    assert!(reset_at > Utc::now());

    // The provider was never consulted for the rejected request.
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn identities_do_not_share_quota() {
    let provider = ScriptedProvider::new();
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .limits(strict_limits(1))
        .build()
        .unwrap();

    gateway
        .generate("ada", &request_for(natal_chart(1)))
        .await
        .unwrap();

    // Fresh identity, fresh chart: its own budget.
    let result = gateway.generate("grace", &request_for(natal_chart(2))).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn failed_generation_leaves_cache_untouched() {
    let provider = ScriptedProvider::failing_first(1);
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));

    let err = gateway.generate("ada", &request).await.unwrap_err();
    assert!(matches!(err, UraniaError::Api { .. }));

    // No negative caching: the retry is a fresh miss that generates.
    let retry = gateway.generate("ada", &request).await.unwrap();
    assert!(!retry.from_cache);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn failed_generation_still_consumes_quota() {
    let provider = ScriptedProvider::failing_first(1);
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .limits(strict_limits(2))
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));

    gateway.generate("ada", &request).await.unwrap_err();
    let ok = gateway.generate("ada", &request).await.unwrap();
    assert_eq!(ok.remaining, 0);
}

#[tokio::test]
async fn disabled_cache_regenerates_every_time() {
    let provider = ScriptedProvider::new();
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .cache(CacheConfig::new().enabled(false))
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));

    let first = gateway.generate("ada", &request).await.unwrap();
    let second = gateway.generate("ada", &request).await.unwrap();
    assert!(!first.from_cache);
    assert!(!second.from_cache);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn unreachable_cache_degrades_to_always_miss() {
    let provider = ScriptedProvider::new();
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .cache_backend(Arc::new(UnreachableBackend))
        .limits(strict_limits(2))
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));

    // Requests succeed despite the dead cache...
    assert!(gateway.generate("ada", &request).await.is_ok());
    assert!(gateway.generate("ada", &request).await.is_ok());
    assert_eq!(provider.calls(), 2);

    // ...and admission control still applies.
    let err = gateway.generate("ada", &request).await.unwrap_err();
    assert!(matches!(err, UraniaError::RateLimitExceeded { .. }));
}

#[tokio::test]
async fn validation_fails_before_provider_and_quota() {
    let provider = ScriptedProvider::new();
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .limits(strict_limits(1))
        .build()
        .unwrap();

    let mut chart = natal_chart(1);
    chart.subject = SubjectKey::named("  ", NaiveDate::from_ymd_opt(1990, 6, 1).unwrap());

    let err = gateway.generate("ada", &request_for(chart)).await.unwrap_err();
    assert!(matches!(err, UraniaError::Validation(_)));
    assert_eq!(provider.calls(), 0);

    // Quota untouched by the invalid request.
    let ok = gateway
        .generate("ada", &request_for(natal_chart(1)))
        .await
        .unwrap();
    assert!(!ok.from_cache);
}

#[tokio::test]
async fn save_scrubs_ephemeral_copy() {
    let provider = ScriptedProvider::new();
    let store = Arc::new(FakeStore::default());
    let backend = Arc::new(InMemoryBackend::new(&CacheConfig::default()));
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .durable_store(store.clone())
        .cache_backend(backend.clone())
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));
    let generated = gateway.generate("ada", &request).await.unwrap();

    // Entry is resident before the save...
    assert!(
        backend
            .get(&generated.fingerprint)
            .await
            .unwrap()
            .is_some()
    );

    gateway
        .save(&generated.fingerprint, "polished version")
        .await
        .unwrap();

    // ...and gone after it, regardless of its remaining TTL.
    assert!(backend.get(&generated.fingerprint).await.unwrap().is_none());

    // Read paths now see only the durable copy.
    let stored = gateway.lookup(&request.chart).await.unwrap().unwrap();
    assert_eq!(stored.text, "polished version");
    assert!(!stored.from_cache);
}

#[tokio::test]
async fn discard_scrubs_ephemeral_copy_too() {
    let provider = ScriptedProvider::new();
    let store = Arc::new(FakeStore::default());
    let backend = Arc::new(InMemoryBackend::new(&CacheConfig::default()));
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .durable_store(store.clone())
        .cache_backend(backend.clone())
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));
    let generated = gateway.generate("ada", &request).await.unwrap();
    gateway.save(&generated.fingerprint, "saved").await.unwrap();

    // Re-generate so both durable and ephemeral copies exist.
    gateway.generate("ada", &request).await.unwrap();

    gateway.discard(&generated.fingerprint).await.unwrap();

    assert!(backend.get(&generated.fingerprint).await.unwrap().is_none());
    assert!(gateway.lookup(&request.chart).await.unwrap().is_none());
}

#[tokio::test]
async fn lookup_prefers_durable_over_ephemeral() {
    let provider = ScriptedProvider::new();
    let store = Arc::new(FakeStore::default());
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .durable_store(store.clone())
        .build()
        .unwrap();

    let request = request_for(natal_chart(1));
    let generated = gateway.generate("ada", &request).await.unwrap();

    // Write a durable copy behind the gateway's back, leaving the
    // ephemeral entry in place.
    store.save(&generated.fingerprint, "durable text").await.unwrap();

    let stored = gateway.lookup(&request.chart).await.unwrap().unwrap();
    assert_eq!(stored.text, "durable text");
    assert!(!stored.from_cache);
}

#[tokio::test]
async fn invalidation_failure_does_not_fail_save() {
    let provider = ScriptedProvider::new();
    let store = Arc::new(FakeStore::default());
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .durable_store(store.clone())
        .cache_backend(Arc::new(UnreachableBackend))
        .build()
        .unwrap();

    let fingerprint = natal_chart(1).fingerprint().unwrap();
    gateway.save(&fingerprint, "kept").await.unwrap();

    assert_eq!(
        store.load(&fingerprint).await.unwrap().as_deref(),
        Some("kept")
    );
}

#[tokio::test]
async fn save_without_store_is_a_configuration_error() {
    let gateway = Urania::builder()
        .provider(ScriptedProvider::new())
        .retry(RetryConfig::disabled())
        .build()
        .unwrap();

    let fingerprint = natal_chart(1).fingerprint().unwrap();
    let err = gateway.save(&fingerprint, "text").await.unwrap_err();
    assert!(matches!(err, UraniaError::Configuration(_)));
}

#[test]
fn builder_without_provider_fails() {
    let result = Urania::builder().build();
    assert!(matches!(result, Err(UraniaError::NoProvider)));
}

#[tokio::test]
async fn transit_re_request_same_day_hits_cache() {
    // A transit generated in the morning and re-requested four hours
    // later the same day shares a fingerprint, so the second request is
    // a cache hit — staleness (covered in staleness_test) is what flags
    // the four-hour drift, not the cache.
    let provider = ScriptedProvider::new();
    let gateway = Urania::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .build()
        .unwrap();

    let subject = SubjectKey::named("Ada", NaiveDate::from_ymd_opt(1815, 12, 10).unwrap());
    let birth = NaiveDate::from_ymd_opt(1815, 12, 10).unwrap();
    let morning = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let afternoon = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

    let first = gateway
        .generate(
            "ada",
            &request_for(ChartSpec::transit(subject.clone(), birth, morning)),
        )
        .await
        .unwrap();
    assert!(!first.from_cache);

    let second = gateway
        .generate(
            "ada",
            &request_for(ChartSpec::transit(subject, birth, afternoon)),
        )
        .await
        .unwrap();
    assert!(second.from_cache);
    assert_eq!(provider.calls(), 1);
}
