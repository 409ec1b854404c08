//! Telemetry metric name constants.
//!
//! Centralised metric names for urania operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `urania_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation` — gateway operation (e.g. "generate", "lookup")
//! - `tier` — admission tier ("standard" | "strict")
//! - `status` — outcome: "ok" or "error"

/// Total generation requests dispatched through the gateway.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "urania_requests_total";

/// Provider call duration in seconds.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "urania_request_duration_seconds";

/// Total retry attempts against the provider (not counting the initial request).
///
/// Labels: `operation`.
pub const RETRIES_TOTAL: &str = "urania_retries_total";

/// Total interpretation cache hits.
pub const CACHE_HITS_TOTAL: &str = "urania_cache_hits_total";

/// Total interpretation cache misses.
pub const CACHE_MISSES_TOTAL: &str = "urania_cache_misses_total";

/// Total ephemeral entries invalidated after a durable write.
pub const CACHE_INVALIDATIONS_TOTAL: &str = "urania_cache_invalidations_total";

/// Total requests rejected by admission control.
///
/// Labels: `tier`.
pub const ADMISSION_REJECTIONS_TOTAL: &str = "urania_admission_rejections_total";
