//! Urania error types

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Urania error types
#[derive(Debug, thiserror::Error)]
pub enum UraniaError {
    // Request errors
    #[error("invalid chart request: {0}")]
    Validation(String),

    /// The caller exhausted its quota for the tier gating this operation.
    ///
    /// Recoverable and user-visible: `remaining` is zero by construction,
    /// `reset_at` tells the client when the window opens again. Never a
    /// system fault.
    #[error("rate limited until {reset_at} (limit {limit})")]
    RateLimitExceeded {
        limit: u32,
        reset_at: DateTime<Utc>,
    },

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("provider error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The upstream AI service itself rate-limited us. Distinct from
    /// [`RateLimitExceeded`](Self::RateLimitExceeded), which is our own
    /// admission control rejecting the caller.
    #[error("provider rate limited, retry after {retry_after:?}")]
    ProviderRateLimited { retry_after: Option<Duration> },

    #[error("empty interpretation from provider")]
    EmptyResponse,

    // Cache infrastructure errors
    /// Backing storage for the ephemeral cache is unreachable. Soft: the
    /// store degrades to always-miss; admission control still applies.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Removing an ephemeral entry after a durable write failed. Logged,
    /// never rolls back the save that preceded it.
    #[error("cache invalidation failed: {0}")]
    Invalidation(String),

    // Durable store errors
    #[error("durable store error: {0}")]
    Store(String),

    // Configuration errors
    #[error("no interpretation provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UraniaError {
    /// Whether a retry of the same operation could plausibly succeed.
    ///
    /// Drives the provider retry decorator: transient errors are retried
    /// with backoff, everything else is returned immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            UraniaError::Http(_) | UraniaError::ProviderRateLimited { .. } => true,
            UraniaError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            UraniaError::ProviderRateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Urania operations
pub type Result<T> = std::result::Result<T, UraniaError>;
