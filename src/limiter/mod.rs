//! Admission control.
//!
//! [`AdmissionController`] gates expensive operations with per-identity,
//! per-tier fixed-window counters. It is orthogonal to the interpretation
//! cache: a cache hit never reaches admission control (no generation, no
//! quota), and the cache being disabled or unreachable does not relax
//! admission.
//!
//! # Tiers
//!
//! Two tiers with fully independent budgets: [`Tier::Standard`] for
//! read-ish, low-cost operations and [`Tier::Strict`] for expensive or
//! mutating ones (AI generation, destructive writes). Exhausting one tier
//! leaves the other's accounting untouched.
//!
//! # Algorithm
//!
//! Fixed-window counting, matching the window shape callers see in
//! `reset_at`. A window opens on the first request, counts up to the
//! tier's ceiling, and resets when its length elapses. Known boundary
//! behavior: a caller can burst up to 2× the nominal ceiling across a
//! window edge; acceptable for quota enforcement (as opposed to load
//! shedding). Counter increments happen under a single write guard, so
//! concurrent requests cannot both observe the pre-increment count and
//! overshoot the ceiling.
//!
//! # Rejection contract
//!
//! A rejection is an immediate, synchronous decision carrying
//! `remaining = 0` and `reset_at` so the client can back off
//! intelligently. Backoff policy belongs to the caller; `check` never
//! retries or blocks on anything but its own map lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::telemetry;

/// Independently-budgeted class of rate-limited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Read-ish, low-cost operations.
    Standard,
    /// Expensive or mutating operations (AI generation, deletes).
    Strict,
}

impl Tier {
    /// Stable lowercase name, used in metrics labels and config keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Standard => "standard",
            Tier::Strict => "strict",
        }
    }
}

/// Ceiling and window length for one tier.
#[derive(Debug, Clone)]
pub struct TierLimit {
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl TierLimit {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Per-tier limits, constructed once at process start and injected into
/// the controller.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub standard: TierLimit,
    pub strict: TierLimit,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            // Read-ish traffic: generous.
            standard: TierLimit::new(120, Duration::from_secs(60)),
            // Generation and mutation: one short burst per hour.
            strict: TierLimit::new(10, Duration::from_secs(3600)),
        }
    }
}

impl LimiterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard(mut self, limit: TierLimit) -> Self {
        self.standard = limit;
        self
    }

    pub fn strict(mut self, limit: TierLimit) -> Self {
        self.strict = limit;
        self
    }

    fn limit_for(&self, tier: Tier) -> &TierLimit {
        match tier {
            Tier::Standard => &self.standard,
            Tier::Strict => &self.strict,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Requests left in the active window. Never negative.
    pub remaining: u32,
    /// The tier's ceiling, for `x-ratelimit-limit`-style reporting.
    pub limit: u32,
    /// When the active window resets.
    pub reset_at: DateTime<Utc>,
}

/// One active window per (identity, tier).
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-identity, per-tier request gate.
pub struct AdmissionController {
    config: LimiterConfig,
    windows: RwLock<HashMap<(String, Tier), Window>>,
}

impl AdmissionController {
    /// Create a controller with the given per-tier limits.
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Check and consume quota for one request.
    ///
    /// Allowed requests increment the window counter; rejected ones do
    /// not. Rejections emit a counter metric but are never logged as
    /// faults — running into a quota is normal client behavior.
    pub async fn check(&self, identity: &str, tier: Tier) -> Decision {
        let limit = self.config.limit_for(tier).clone();
        let now = Instant::now();

        let mut windows = self.windows.write().await;
        let window = windows
            .entry((identity.to_owned(), tier))
            .or_insert_with(|| Window {
                started: now,
                count: 0,
            });

        // Window elapsed: reset in place rather than allocating anew.
        if now.duration_since(window.started) >= limit.window {
            window.started = now;
            window.count = 0;
        }

        let reset_at = reset_timestamp(window.started, now, limit.window);

        if window.count < limit.max_requests {
            window.count += 1;
            Decision {
                allowed: true,
                remaining: limit.max_requests - window.count,
                limit: limit.max_requests,
                reset_at,
            }
        } else {
            metrics::counter!(telemetry::ADMISSION_REJECTIONS_TOTAL, "tier" => tier.as_str())
                .increment(1);
            Decision {
                allowed: false,
                remaining: 0,
                limit: limit.max_requests,
                reset_at,
            }
        }
    }

    /// Report quota without consuming it.
    ///
    /// Used by paths that must surface `remaining`/`limit` to the client
    /// but did not perform a gated operation (e.g. a cache hit).
    pub async fn status(&self, identity: &str, tier: Tier) -> Decision {
        let limit = self.config.limit_for(tier).clone();
        let now = Instant::now();

        let windows = self.windows.read().await;
        match windows.get(&(identity.to_owned(), tier)) {
            Some(window) if now.duration_since(window.started) < limit.window => Decision {
                allowed: window.count < limit.max_requests,
                remaining: limit.max_requests.saturating_sub(window.count),
                limit: limit.max_requests,
                reset_at: reset_timestamp(window.started, now, limit.window),
            },
            // No window yet, or it already elapsed: full budget.
            _ => Decision {
                allowed: limit.max_requests > 0,
                remaining: limit.max_requests,
                limit: limit.max_requests,
                reset_at: Utc::now()
                    + chrono::Duration::from_std(limit.window)
                        .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            },
        }
    }

    /// Drop windows that elapsed more than `older_than` ago.
    ///
    /// Space reclamation only — correctness never depends on it, since
    /// `check` resets elapsed windows lazily.
    pub async fn purge_expired(&self, older_than: Duration) {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        windows.retain(|(_, tier), window| {
            let window_len = self.config.limit_for(*tier).window;
            now.duration_since(window.started) < window_len + older_than
        });
    }

    /// Number of live (identity, tier) windows. Test and ops visibility.
    pub async fn window_count(&self) -> usize {
        self.windows.read().await.len()
    }
}

/// Wall-clock instant at which a window started at `started` resets.
fn reset_timestamp(started: Instant, now: Instant, window: Duration) -> DateTime<Utc> {
    let elapsed = now.duration_since(started);
    let left = window.saturating_sub(elapsed);
    Utc::now() + chrono::Duration::from_std(left).unwrap_or_else(|_| chrono::Duration::seconds(0))
}
