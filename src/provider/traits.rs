//! Core InterpretationProvider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::fingerprint::ChartSpec;

/// Interpretive school the generated text should follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum School {
    #[default]
    Western,
    Vedic,
    Hellenistic,
}

impl School {
    pub fn as_str(&self) -> &'static str {
        match self {
            School::Western => "western",
            School::Vedic => "vedic",
            School::Hellenistic => "hellenistic",
        }
    }
}

/// Relationship framing for synastry/composite interpretations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Romantic,
    Friendship,
    Business,
    Family,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Romantic => "romantic",
            RelationshipType::Friendship => "friendship",
            RelationshipType::Business => "business",
            RelationshipType::Family => "family",
        }
    }
}

/// Everything a provider needs to write one interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The chart configuration being interpreted.
    pub chart: ChartSpec,
    /// Geometry from the astrology engine (positions, aspects, houses).
    /// Opaque to this layer — forwarded to the provider verbatim.
    pub chart_data: serde_json::Value,
    #[serde(default)]
    pub school: School,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<RelationshipType>,
}

/// The outbound seam to the AI text-generation service.
///
/// Fallible and latency-bearing; implementations must not cache — that
/// responsibility sits in the gateway above.
#[async_trait]
pub trait InterpretationProvider: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &str;

    /// Generate interpretation text for one chart.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
