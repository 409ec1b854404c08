//! HTTP client for the interpretation generation service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::{GenerationRequest, InterpretationProvider};
use crate::{Result, UraniaError};

/// Default request timeout. Generation is slow by nature.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the interpretation service's REST API.
///
/// Posts the chart geometry plus interpretive options and receives plain
/// text back. Authentication is a bearer key.
#[derive(Clone)]
pub struct HttpInterpretationProvider {
    api_key: String,
    model: String,
    http: Client,
    base_url: String,
}

impl HttpInterpretationProvider {
    /// Create a provider against the given service URL.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self::with_timeout(base_url, api_key, model, DEFAULT_TIMEOUT)
    }

    /// Create a provider with a custom request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.into(),
            model: model.into(),
            http,
            base_url: base_url.into(),
        }
    }

    fn handle_response_errors(&self, response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(UraniaError::ProviderRateLimited { retry_after });
        }

        Err(UraniaError::Api {
            status: status.as_u16(),
            message: status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string(),
        })
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    chart_type: &'a str,
    chart_data: &'a serde_json::Value,
    school: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    relationship: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateReply {
    text: String,
}

#[async_trait]
impl InterpretationProvider for HttpInterpretationProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/v1/generate", self.base_url);

        let body = GenerateBody {
            model: &self.model,
            chart_type: request.chart.kind.as_str(),
            chart_data: &request.chart_data,
            school: request.school.as_str(),
            relationship: request.relationship.map(|r| r.as_str()),
        };

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| UraniaError::Http(e.to_string()))?;

        self.handle_response_errors(&response)?;

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| UraniaError::Http(e.to_string()))?;

        if reply.text.trim().is_empty() {
            return Err(UraniaError::EmptyResponse);
        }

        Ok(reply.text)
    }
}
