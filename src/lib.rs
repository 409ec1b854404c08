//! Urania - interpretation cache and admission-control gateway for
//! astrology chart services.
//!
//! This crate sits between a chart UI and an expensive AI text-generation
//! provider. It derives a stable [`Fingerprint`] for each chart
//! configuration, serves repeated requests from a TTL-bounded cache,
//! gates real generation behind per-identity admission control, flags
//! displayed text whose chart parameters have drifted, and scrubs
//! ephemeral copies once text is durably saved.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::{NaiveDate, Utc};
//! use urania::{
//!     ChartSpec, GenerationRequest, HttpInterpretationProvider, School, SubjectKey, Urania,
//! };
//!
//! #[tokio::main]
//! async fn main() -> urania::Result<()> {
//!     let gateway = Urania::builder()
//!         .provider(Arc::new(HttpInterpretationProvider::new(
//!             "https://interpret.example.com",
//!             "sk-your-key",
//!             "stella-2",
//!         )))
//!         .build()?;
//!
//!     let chart = ChartSpec::transit(
//!         SubjectKey::named("Ada", NaiveDate::from_ymd_opt(1815, 12, 10).unwrap()),
//!         NaiveDate::from_ymd_opt(1815, 12, 10).unwrap(),
//!         Utc::now(),
//!     );
//!
//!     let result = gateway
//!         .generate(
//!             "user-42",
//!             &GenerationRequest {
//!                 chart,
//!                 chart_data: serde_json::json!({}),
//!                 school: School::Western,
//!                 relationship: None,
//!             },
//!         )
//!         .await?;
//!
//!     println!("{} (cached: {})", result.text, result.from_cache);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod limiter;
pub mod provider;
#[cfg(feature = "server")]
pub mod server;
pub mod staleness;
pub mod store;
pub mod telemetry;
pub mod version;

// Re-export main types at crate root
pub use error::{Result, UraniaError};
pub use gateway::{
    Interpretation, InterpretationGateway, StoredInterpretation, Urania, UraniaBuilder,
};
pub use version::{PKG_VERSION, version_string};

// Re-export component types
pub use cache::{CacheBackend, CacheConfig, CachedInterpretation, InterpretationCache};
pub use fingerprint::{ChartKind, ChartSpec, Fingerprint, SubjectKey};
pub use limiter::{AdmissionController, Decision, LimiterConfig, Tier, TierLimit};
pub use provider::{
    GenerationRequest, HttpInterpretationProvider, InterpretationProvider, RelationshipType,
    RetryConfig, School,
};
pub use staleness::{
    DEFAULT_STALENESS_TOLERANCE, InterpretationReview, Provenance, ReviewEvent, ReviewState,
    is_stale,
};
pub use store::DurableStore;
