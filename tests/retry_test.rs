//! Tests for [`RetryingProvider`] — backoff behaviour around the
//! interpretation provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use urania::{
    ChartSpec, GenerationRequest, InterpretationProvider, RetryConfig, School, SubjectKey,
    UraniaError,
};
use urania::provider::RetryingProvider;

/// Provider that fails with a scripted error N times, then succeeds.
struct FlakyProvider {
    calls: AtomicU32,
    fail_times: u32,
    error: fn() -> UraniaError,
}

impl FlakyProvider {
    fn new(fail_times: u32, error: fn() -> UraniaError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            fail_times,
            error,
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterpretationProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn generate(&self, _request: &GenerationRequest) -> urania::Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_times {
            return Err((self.error)());
        }
        Ok("written in the stars".to_string())
    }
}

fn request() -> GenerationRequest {
    GenerationRequest {
        chart: ChartSpec::natal(
            SubjectKey::from_id(1),
            NaiveDate::from_ymd_opt(1990, 6, 1).unwrap(),
        ),
        chart_data: serde_json::json!({}),
        school: School::Western,
        relationship: None,
    }
}

fn fast_retries(max_attempts: u32) -> RetryConfig {
    RetryConfig::new()
        .max_attempts(max_attempts)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
}

#[tokio::test]
async fn transient_errors_are_retried_to_success() {
    let inner = FlakyProvider::new(2, || UraniaError::Http("connection reset".into()));
    let provider = RetryingProvider::new(inner.clone(), fast_retries(3));

    let text = provider.generate(&request()).await.unwrap();
    assert_eq!(text, "written in the stars");
    assert_eq!(inner.calls(), 3);
}

#[tokio::test]
async fn permanent_errors_are_not_retried() {
    let inner = FlakyProvider::new(5, || UraniaError::Api {
        status: 400,
        message: "bad request".into(),
    });
    let provider = RetryingProvider::new(inner.clone(), fast_retries(3));

    let err = provider.generate(&request()).await.unwrap_err();
    assert!(matches!(err, UraniaError::Api { status: 400, .. }));
    assert_eq!(inner.calls(), 1);
}

#[tokio::test]
async fn exhausted_attempts_return_last_error() {
    let inner = FlakyProvider::new(10, || UraniaError::Http("still down".into()));
    let provider = RetryingProvider::new(inner.clone(), fast_retries(3));

    let err = provider.generate(&request()).await.unwrap_err();
    assert!(matches!(err, UraniaError::Http(_)));
    assert_eq!(inner.calls(), 3);
}

#[tokio::test]
async fn disabled_config_makes_a_single_attempt() {
    let inner = FlakyProvider::new(1, || UraniaError::Http("blip".into()));
    let provider = RetryingProvider::new(inner.clone(), RetryConfig::disabled());

    assert!(provider.generate(&request()).await.is_err());
    assert_eq!(inner.calls(), 1);
}

#[tokio::test]
async fn provider_rate_limit_hint_is_honoured() {
    // A short retry-after hint should not stall the test; it also proves
    // the hint path is taken (default backoff would be fine too, this
    // pins the fast path).
    let inner = FlakyProvider::new(1, || UraniaError::ProviderRateLimited {
        retry_after: Some(Duration::from_millis(2)),
    });
    let provider = RetryingProvider::new(inner.clone(), fast_retries(2));

    let started = std::time::Instant::now();
    let text = provider.generate(&request()).await.unwrap();
    assert_eq!(text, "written in the stars");
    assert_eq!(inner.calls(), 2);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn name_is_delegated() {
    let inner = FlakyProvider::new(0, || UraniaError::EmptyResponse);
    let provider = RetryingProvider::new(inner, RetryConfig::disabled());
    assert_eq!(provider.name(), "flaky");
}
