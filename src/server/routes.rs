//! HTTP routes for the interpretation gateway.
//!
//! Thin glue: handlers extract the caller identity, apply route-level
//! admission for read paths, and delegate to
//! [`InterpretationGateway`](crate::InterpretationGateway). Every gated
//! response carries `x-ratelimit-limit`, `x-ratelimit-remaining`, and
//! `x-ratelimit-reset` so clients can render a countdown rather than
//! blind-retry.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use super::error::{ApiError, quota_headers};
use crate::fingerprint::{ChartKind, ChartSpec, Fingerprint, SubjectKey};
use crate::limiter::Tier;
use crate::provider::GenerationRequest;
use crate::{InterpretationGateway, version_string};

/// Shared route state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<InterpretationGateway>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/v1/interpretations",
            get(get_interpretation).post(post_interpretation),
        )
        .route("/v1/interpretations/persisted", post(interpretation_persisted))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Stable per-user identity, issued upstream (session middleware or
/// reverse proxy) and forwarded as a header.
fn identity(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
        .ok_or(ApiError::Unauthorized)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": version_string(),
    }))
}

/// Flat query form of a chart request.
#[derive(Debug, Deserialize)]
struct ChartQuery {
    kind: ChartKind,
    subject_id: Option<u64>,
    subject_name: Option<String>,
    subject_birth_date: Option<NaiveDate>,
    reference_date: NaiveDate,
    partner_id: Option<u64>,
    partner_name: Option<String>,
    partner_birth_date: Option<NaiveDate>,
    as_of: Option<DateTime<Utc>>,
    cycle: Option<u32>,
}

fn subject_from_parts(
    role: &str,
    id: Option<u64>,
    name: Option<String>,
    birth_date: Option<NaiveDate>,
) -> Result<SubjectKey, ApiError> {
    match (id, name, birth_date) {
        (Some(id), _, _) => Ok(SubjectKey::from_id(id)),
        (None, Some(name), Some(birth_date)) => Ok(SubjectKey::named(name, birth_date)),
        _ => Err(ApiError::BadRequest(format!(
            "{role} subject requires either an id or a name plus birth date"
        ))),
    }
}

impl TryFrom<ChartQuery> for ChartSpec {
    type Error = ApiError;

    fn try_from(query: ChartQuery) -> Result<Self, ApiError> {
        let subject = subject_from_parts(
            "primary",
            query.subject_id,
            query.subject_name,
            query.subject_birth_date,
        )?;

        let partner = match (query.partner_id, query.partner_name, query.partner_birth_date) {
            (None, None, None) => None,
            (id, name, birth_date) => Some(subject_from_parts("partner", id, name, birth_date)?),
        };

        Ok(ChartSpec {
            kind: query.kind,
            subject,
            reference_date: query.reference_date,
            partner,
            as_of: query.as_of,
            cycle: query.cycle,
        })
    }
}

/// Response body for interpretation reads and generations.
#[derive(Debug, Serialize)]
struct InterpretationBody {
    text: String,
    /// Echoed so the caller can reference this interpretation later
    /// (durable saves, persisted notifications).
    fingerprint: Fingerprint,
    from_cache: bool,
    remaining: u32,
    limit: u32,
}

/// `GET /v1/interpretations` — fetch existing text for a chart.
///
/// Durable store first, then the ephemeral cache; never generates.
/// Gated by the standard tier.
async fn get_interpretation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChartQuery>,
) -> Result<Response, ApiError> {
    let identity = identity(&headers)?;

    let decision = state.gateway.limiter().check(&identity, Tier::Standard).await;
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            limit: decision.limit,
            reset_at: decision.reset_at,
        });
    }
    let headers = quota_headers(decision.limit, decision.remaining, decision.reset_at);

    let chart: ChartSpec = query.try_into()?;
    match state.gateway.lookup(&chart).await? {
        Some(stored) => Ok((
            StatusCode::OK,
            headers,
            Json(InterpretationBody {
                text: stored.text,
                fingerprint: stored.fingerprint,
                from_cache: stored.from_cache,
                remaining: decision.remaining,
                limit: decision.limit,
            }),
        )
            .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            headers,
            Json(serde_json::json!({ "error": "not_found" })),
        )
            .into_response()),
    }
}

/// `POST /v1/interpretations` — produce text for a chart.
///
/// A cache hit returns without consuming strict-tier quota; a miss
/// passes admission control and calls the AI provider.
async fn post_interpretation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerationRequest>,
) -> Result<Response, ApiError> {
    let identity = identity(&headers)?;

    let result = state.gateway.generate(&identity, &request).await?;

    let body = InterpretationBody {
        text: result.text,
        fingerprint: result.fingerprint,
        from_cache: result.from_cache,
        remaining: result.remaining,
        limit: result.limit,
    };
    Ok((
        StatusCode::OK,
        quota_headers(result.limit, result.remaining, result.reset_at),
        Json(body),
    )
        .into_response())
}

/// Notification body after a durable write.
#[derive(Debug, Deserialize)]
struct PersistedRequest {
    fingerprint: Fingerprint,
}

/// `POST /v1/interpretations/persisted` — the app persisted (or deleted)
/// interpretation text durably; scrub the matching ephemeral entry.
///
/// Invoked once per successful durable write. Cheap cache hygiene, so it
/// rides the standard tier; the durable mutation itself was gated by the
/// app's own strict-tier route.
async fn interpretation_persisted(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PersistedRequest>,
) -> Result<Response, ApiError> {
    let identity = identity(&headers)?;

    let decision = state.gateway.limiter().check(&identity, Tier::Standard).await;
    if !decision.allowed {
        return Err(ApiError::RateLimited {
            limit: decision.limit,
            reset_at: decision.reset_at,
        });
    }

    state.gateway.on_persisted(&request.fingerprint).await;

    Ok((
        StatusCode::NO_CONTENT,
        quota_headers(decision.limit, decision.remaining, decision.reset_at),
    )
        .into_response())
}
