//! API error mapping.
//!
//! Translates [`UraniaError`] into HTTP responses with enough structure
//! for the UI to render directly — no stack traces, no internal
//! identifiers. Rate-limit rejections carry the quota headers and the
//! `{ "error": "rate_limited", "remaining": 0, "reset_at" }` payload so
//! clients can render a countdown instead of blind-retrying.

use axum::Json;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::UraniaError;

/// Route-level error response.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    NotFound,
    RateLimited {
        limit: u32,
        reset_at: DateTime<Utc>,
    },
    /// The interpretation service failed; retryable from the client's
    /// point of view.
    Upstream,
    Internal,
}

/// Error body for non-rate-limited failures.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Error body for rate-limit rejections, shaped for direct UI rendering.
#[derive(Debug, Serialize)]
struct RateLimitBody {
    error: &'static str,
    remaining: u32,
    limit: u32,
    reset_at: DateTime<Utc>,
}

/// Quota headers attached to every response on a rate-limited path.
pub fn quota_headers(limit: u32, remaining: u32, reset_at: DateTime<Utc>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in [
        ("x-ratelimit-limit", limit.to_string()),
        ("x-ratelimit-remaining", remaining.to_string()),
        ("x-ratelimit-reset", reset_at.timestamp().to_string()),
    ] {
        if let Ok(value) = value.parse() {
            headers.insert(name, value);
        }
    }
    headers
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: "invalid_request",
                    message: Some(message),
                }),
            )
                .into_response(),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: "unauthorized",
                    message: None,
                }),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: "not_found",
                    message: None,
                }),
            )
                .into_response(),
            ApiError::RateLimited { limit, reset_at } => (
                StatusCode::TOO_MANY_REQUESTS,
                quota_headers(limit, 0, reset_at),
                Json(RateLimitBody {
                    error: "rate_limited",
                    remaining: 0,
                    limit,
                    reset_at,
                }),
            )
                .into_response(),
            ApiError::Upstream => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: "generation_failed",
                    message: Some("interpretation service is unavailable, try again".into()),
                }),
            )
                .into_response(),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "internal_error",
                    message: None,
                }),
            )
                .into_response(),
        }
    }
}

impl From<UraniaError> for ApiError {
    fn from(err: UraniaError) -> Self {
        match err {
            UraniaError::Validation(msg) => ApiError::BadRequest(msg),
            UraniaError::RateLimitExceeded { limit, reset_at } => {
                ApiError::RateLimited { limit, reset_at }
            }
            // Provider failures are retryable from the client's view;
            // details were already logged gateway-side.
            UraniaError::Http(_)
            | UraniaError::Api { .. }
            | UraniaError::ProviderRateLimited { .. }
            | UraniaError::EmptyResponse => ApiError::Upstream,
            _ => ApiError::Internal,
        }
    }
}
